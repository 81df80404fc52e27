//! Wire types of the confirmation endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmAction {
    Approve,
    Reject,
}

/// Answer to a generic ask: the chosen option ids plus optional free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub selected_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_input: Option<String>,
}

/// Body of the confirm call that resumes a paused run. Generic asks carry a
/// `userResponse`; the content-confirm variant carries an `action` plus
/// optional feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfirmRequest {
    #[serde(rename_all = "camelCase")]
    AskUser {
        thread_id: String,
        user_response: UserResponse,
    },
    #[serde(rename_all = "camelCase")]
    Content {
        thread_id: String,
        action: ConfirmAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_feedback: Option<String>,
    },
}

impl ConfirmRequest {
    pub fn thread_id(&self) -> &str {
        match self {
            Self::AskUser { thread_id, .. } | Self::Content { thread_id, .. } => thread_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_user_payload_shape() {
        let request = ConfirmRequest::AskUser {
            thread_id: "t-1".to_string(),
            user_response: UserResponse {
                selected_ids: vec!["o2".to_string()],
                custom_input: Some("更活泼一点".to_string()),
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "threadId": "t-1",
                "userResponse": {"selectedIds": ["o2"], "customInput": "更活泼一点"}
            })
        );
    }

    #[test]
    fn test_content_confirm_payload_shape() {
        let request = ConfirmRequest::Content {
            thread_id: "t-2".to_string(),
            action: ConfirmAction::Reject,
            user_feedback: Some("标题太平".to_string()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "threadId": "t-2",
                "action": "reject",
                "userFeedback": "标题太平"
            })
        );
    }

    #[test]
    fn test_approve_without_feedback_omits_field() {
        let request = ConfirmRequest::Content {
            thread_id: "t-3".to_string(),
            action: ConfirmAction::Approve,
            user_feedback: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("userFeedback"));
    }
}
