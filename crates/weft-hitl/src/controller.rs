//! The pause/resume state machine layered on top of the running dialog
//! state.
//!
//! The controller owns only the phase; the dialog itself lives in the run
//! state so it survives reloads and can be rebuilt from history. Submission
//! closes the dialog optimistically, before the collaborator has answered.

use crate::error::HitlError;
use crate::request::{ConfirmAction, ConfirmRequest, UserResponse};
use weft_types::{AskUserDialogState, SelectionType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HitlPhase {
    #[default]
    Idle,
    AwaitingUser,
    Submitting,
    Resumed,
}

#[derive(Debug, Default)]
pub struct HitlController {
    phase: HitlPhase,
}

impl HitlController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> HitlPhase {
        self.phase
    }

    /// Sync the phase with the reducer's dialog state after events were
    /// applied. An open dialog moves the machine to `AwaitingUser`.
    pub fn observe(&mut self, dialog: &AskUserDialogState) {
        if dialog.is_open && self.phase != HitlPhase::Submitting {
            self.phase = HitlPhase::AwaitingUser;
        }
    }

    /// Validate the current selection and turn it into the confirmation
    /// payload. On success the dialog is closed and the machine moves to
    /// `Submitting`; the caller then sends the request and starts the
    /// resume stream.
    pub fn begin_submit(
        &mut self,
        dialog: &mut AskUserDialogState,
    ) -> Result<ConfirmRequest, HitlError> {
        if !dialog.is_open {
            return Err(HitlError::Protocol(
                "confirmation submitted with no open dialog".to_string(),
            ));
        }

        let custom_input = trimmed(&dialog.custom_input);
        let request = if dialog.is_content_confirm() {
            let rejecting = dialog
                .selected_ids
                .iter()
                .any(|id| is_reject_option(dialog, id));
            if rejecting && custom_input.is_none() {
                return Err(HitlError::Validation(
                    "rejecting requires feedback text".to_string(),
                ));
            }
            ConfirmRequest::Content {
                thread_id: dialog.thread_id.clone(),
                action: if rejecting {
                    ConfirmAction::Reject
                } else {
                    ConfirmAction::Approve
                },
                user_feedback: custom_input,
            }
        } else {
            if dialog.selection_type != SelectionType::None
                && dialog.selected_ids.is_empty()
                && custom_input.is_none()
            {
                return Err(HitlError::Validation(
                    "select an option or enter text".to_string(),
                ));
            }
            ConfirmRequest::AskUser {
                thread_id: dialog.thread_id.clone(),
                user_response: UserResponse {
                    selected_ids: dialog.selected_ids.clone(),
                    custom_input,
                },
            }
        };

        dialog.close();
        self.phase = HitlPhase::Submitting;
        tracing::debug!(thread_id = %request.thread_id(), "submitting confirmation");
        Ok(request)
    }

    /// Close the dialog without answering. The server-side run stays
    /// paused; no request is sent.
    pub fn dismiss(&mut self, dialog: &mut AskUserDialogState) {
        dialog.close();
        self.phase = HitlPhase::Idle;
    }

    /// The resume stream has been started for a submitted confirmation.
    pub fn mark_resumed(&mut self) {
        self.phase = HitlPhase::Resumed;
    }
}

fn is_reject_option(dialog: &AskUserDialogState, selected_id: &str) -> bool {
    if selected_id.eq_ignore_ascii_case("reject") || selected_id.eq_ignore_ascii_case("no") {
        return true;
    }
    dialog
        .options
        .iter()
        .find(|option| option.id == selected_id)
        .is_some_and(|option| {
            option.label.contains("拒绝") || option.label.to_lowercase().contains("reject")
        })
}

fn trimmed(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};
    use weft_types::{AskUserOption, AskUserRequest, HITL_CONTEXT_MARKER};

    fn content_confirm_dialog() -> AskUserDialogState {
        let mut context = Map::new();
        context.insert(HITL_CONTEXT_MARKER.to_string(), Value::Bool(true));
        AskUserDialogState::open(AskUserRequest {
            question: "内容可以吗?".to_string(),
            options: vec![
                AskUserOption {
                    id: "approve".to_string(),
                    label: "通过".to_string(),
                    ..Default::default()
                },
                AskUserOption {
                    id: "reject".to_string(),
                    label: "拒绝".to_string(),
                    ..Default::default()
                },
            ],
            selection_type: SelectionType::Single,
            allow_custom_input: true,
            thread_id: "t-1".to_string(),
            context,
        })
    }

    #[test]
    fn test_reject_without_feedback_is_blocked() {
        let mut controller = HitlController::new();
        let mut dialog = content_confirm_dialog();
        controller.observe(&dialog);
        assert_eq!(controller.phase(), HitlPhase::AwaitingUser);

        dialog.select("reject");
        let result = controller.begin_submit(&mut dialog);
        assert!(matches!(result, Err(HitlError::Validation(_))));
        // Blocked submissions leave the dialog open.
        assert!(dialog.is_open);
        assert_eq!(controller.phase(), HitlPhase::AwaitingUser);
    }

    #[test]
    fn test_reject_with_feedback_builds_content_request() {
        let mut controller = HitlController::new();
        let mut dialog = content_confirm_dialog();
        dialog.select("reject");
        dialog.set_custom_input("标题太普通了");

        let request = controller.begin_submit(&mut dialog).unwrap();
        match request {
            ConfirmRequest::Content {
                thread_id,
                action,
                user_feedback,
            } => {
                assert_eq!(thread_id, "t-1");
                assert_eq!(action, ConfirmAction::Reject);
                assert_eq!(user_feedback.as_deref(), Some("标题太普通了"));
            }
            other => panic!("Expected content confirm, got {other:?}"),
        }
        assert!(!dialog.is_open);
        assert_eq!(controller.phase(), HitlPhase::Submitting);
    }

    #[test]
    fn test_generic_ask_builds_user_response() {
        let mut controller = HitlController::new();
        let mut dialog = AskUserDialogState::open(AskUserRequest {
            question: "选一个主题".to_string(),
            options: vec![AskUserOption {
                id: "o1".to_string(),
                label: "One".to_string(),
                ..Default::default()
            }],
            selection_type: SelectionType::Single,
            allow_custom_input: true,
            thread_id: "t-2".to_string(),
            context: Map::new(),
        });
        dialog.select("o1");

        let request = controller.begin_submit(&mut dialog).unwrap();
        match request {
            ConfirmRequest::AskUser {
                thread_id,
                user_response,
            } => {
                assert_eq!(thread_id, "t-2");
                assert_eq!(user_response.selected_ids, vec!["o1".to_string()]);
                assert!(user_response.custom_input.is_none());
            }
            other => panic!("Expected ask-user confirm, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_selection_is_blocked() {
        let mut controller = HitlController::new();
        let mut dialog = AskUserDialogState::open(AskUserRequest {
            question: "选一个".to_string(),
            selection_type: SelectionType::Single,
            thread_id: "t-3".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            controller.begin_submit(&mut dialog),
            Err(HitlError::Validation(_))
        ));
    }

    #[test]
    fn test_submit_without_open_dialog_is_protocol_error() {
        let mut controller = HitlController::new();
        let mut dialog = AskUserDialogState::default();
        assert!(matches!(
            controller.begin_submit(&mut dialog),
            Err(HitlError::Protocol(_))
        ));
    }

    #[test]
    fn test_dismiss_closes_without_submitting() {
        let mut controller = HitlController::new();
        let mut dialog = content_confirm_dialog();
        controller.observe(&dialog);
        controller.dismiss(&mut dialog);
        assert!(!dialog.is_open);
        assert_eq!(controller.phase(), HitlPhase::Idle);
    }
}
