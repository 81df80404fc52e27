//! Reconciliation of historical conversations with a pending ask.

use weft_types::{AskUserRequest, ChatMessage};

/// When a previously started conversation is loaded and its latest
/// assistant message carries an `ask_user` nobody answered, the dialog must
/// be reopened identically. A later user message with a matching
/// `askUserResponse` counts as the answer; responses carrying a `threadId`
/// in their context are matched against it, responses without one match any
/// pending ask.
pub fn detect_unanswered_ask(messages: &[ChatMessage]) -> Option<AskUserRequest> {
    let (index, request) = messages
        .iter()
        .enumerate()
        .rev()
        .find_map(|(index, message)| {
            message
                .ask_user
                .as_ref()
                .filter(|_| message.is_assistant())
                .map(|request| (index, request))
        })?;

    let answered = messages[index + 1..].iter().any(|message| {
        let Some(response) = &message.ask_user_response else {
            return false;
        };
        match response
            .context
            .as_ref()
            .and_then(|context| context.get("threadId"))
            .and_then(|value| value.as_str())
        {
            Some(thread_id) => thread_id == request.thread_id,
            None => true,
        }
    });

    if answered {
        None
    } else {
        Some(request.clone())
    }
}
