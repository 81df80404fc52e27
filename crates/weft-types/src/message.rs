use crate::events::{AgentEvent, AskUserRequest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// The user's answer to a preceding HITL request, carried on the user
/// message that resumes the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskUserResponse {
    #[serde(default)]
    pub selected_ids: Vec<String>,
    #[serde(default)]
    pub selected_labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

/// One turn of the conversation. Assistant messages snapshot the events
/// accumulated so far so a closed conversation can rebuild its timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<AgentEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask_user: Option<AskUserRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask_user_response: Option<AskUserResponse>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            events: None,
            ask_user: None,
            ask_user_response: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            events: None,
            ask_user: None,
            ask_user_response: None,
        }
    }

    /// User message answering a HITL request. The visible content is the
    /// free text when present, else the selected labels.
    pub fn ask_answer(response: AskUserResponse) -> Self {
        let content = response
            .custom_input
            .clone()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| {
                if response.selected_labels.is_empty() {
                    response.selected_ids.join(", ")
                } else {
                    response.selected_labels.join(", ")
                }
            });
        Self {
            role: Role::User,
            content,
            events: None,
            ask_user: None,
            ask_user_response: Some(response),
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_answer_prefers_custom_input() {
        let message = ChatMessage::ask_answer(AskUserResponse {
            selected_ids: vec!["o1".into()],
            selected_labels: vec!["Option one".into()],
            custom_input: Some("my own words".into()),
            context: None,
        });
        assert_eq!(message.content, "my own words");
        assert!(message.ask_user_response.is_some());
    }

    #[test]
    fn test_ask_answer_falls_back_to_labels() {
        let message = ChatMessage::ask_answer(AskUserResponse {
            selected_ids: vec!["o1".into(), "o2".into()],
            selected_labels: vec!["One".into(), "Two".into()],
            custom_input: None,
            context: None,
        });
        assert_eq!(message.content, "One, Two");
    }
}
