use crate::events::{AskUserOption, AskUserRequest, SelectionType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Context key marking the content-confirm variant of an `ask_user`
/// request. Rejecting that variant requires non-empty feedback text.
pub const HITL_CONTEXT_MARKER: &str = "__hitl";

/// State of the HITL dialog for one conversation. At most one dialog is
/// open per conversation at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskUserDialogState {
    pub is_open: bool,
    pub question: String,
    pub options: Vec<AskUserOption>,
    pub selection_type: SelectionType,
    pub allow_custom_input: bool,
    pub thread_id: String,
    pub context: Map<String, Value>,
    pub selected_ids: Vec<String>,
    pub custom_input: String,
}

impl AskUserDialogState {
    /// Open the dialog for a request, discarding any stale selection.
    pub fn open(request: AskUserRequest) -> Self {
        Self {
            is_open: true,
            question: request.question,
            options: request.options,
            selection_type: request.selection_type,
            allow_custom_input: request.allow_custom_input,
            thread_id: request.thread_id,
            context: request.context,
            selected_ids: Vec::new(),
            custom_input: String::new(),
        }
    }

    pub fn close(&mut self) {
        self.is_open = false;
    }

    /// The request this dialog was opened for.
    pub fn request(&self) -> AskUserRequest {
        AskUserRequest {
            question: self.question.clone(),
            options: self.options.clone(),
            selection_type: self.selection_type,
            allow_custom_input: self.allow_custom_input,
            thread_id: self.thread_id.clone(),
            context: self.context.clone(),
        }
    }

    /// Single-select replaces the selection; multi-select toggles the id.
    pub fn select(&mut self, option_id: &str) {
        match self.selection_type {
            SelectionType::Multiple => {
                if let Some(pos) = self.selected_ids.iter().position(|id| id == option_id) {
                    self.selected_ids.remove(pos);
                } else {
                    self.selected_ids.push(option_id.to_string());
                }
            }
            _ => {
                self.selected_ids = vec![option_id.to_string()];
            }
        }
    }

    pub fn set_custom_input(&mut self, text: impl Into<String>) {
        self.custom_input = text.into();
    }

    /// Whether this is the content-confirm variant (approve/reject with
    /// optional feedback) rather than a generic ask.
    pub fn is_content_confirm(&self) -> bool {
        self.context.contains_key(HITL_CONTEXT_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(selection_type: SelectionType) -> AskUserRequest {
        AskUserRequest {
            question: "pick".into(),
            options: vec![
                AskUserOption {
                    id: "a".into(),
                    label: "A".into(),
                    ..Default::default()
                },
                AskUserOption {
                    id: "b".into(),
                    label: "B".into(),
                    ..Default::default()
                },
            ],
            selection_type,
            allow_custom_input: true,
            thread_id: "t-1".into(),
            context: Map::new(),
        }
    }

    #[test]
    fn test_single_select_replaces() {
        let mut dialog = AskUserDialogState::open(request_with(SelectionType::Single));
        dialog.select("a");
        dialog.select("b");
        assert_eq!(dialog.selected_ids, vec!["b".to_string()]);
    }

    #[test]
    fn test_multi_select_toggles() {
        let mut dialog = AskUserDialogState::open(request_with(SelectionType::Multiple));
        dialog.select("a");
        dialog.select("b");
        dialog.select("a");
        assert_eq!(dialog.selected_ids, vec!["b".to_string()]);
    }

    #[test]
    fn test_content_confirm_marker() {
        let mut request = request_with(SelectionType::Single);
        request
            .context
            .insert(HITL_CONTEXT_MARKER.into(), Value::Bool(true));
        let dialog = AskUserDialogState::open(request);
        assert!(dialog.is_content_confirm());
    }
}
