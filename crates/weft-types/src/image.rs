use serde::{Deserialize, Serialize};

/// Status of one asynchronous image generation subtask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageTaskStatus {
    #[default]
    Queued,
    Generating,
    Done,
    Failed,
}

impl ImageTaskStatus {
    /// Map the raw wire status onto the four-state enum. The wire uses
    /// `complete` for the terminal success state; anything unrecognized is
    /// treated as still queued.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "complete" | "done" => Self::Done,
            "generating" => Self::Generating,
            "failed" => Self::Failed,
            _ => Self::Queued,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// One image generation subtask, identified by an integer sequence id
/// unique within a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTask {
    pub id: u32,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub status: ImageTaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Resolve an asset id out of an `image_progress` url, which is either an
/// asset URL of the form `/api/assets/<id>` or a bare integer string.
pub fn extract_asset_id(url: &str) -> Option<i64> {
    if let Some(rest) = url.split("/api/assets/").nth(1) {
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            return digits.parse().ok();
        }
    }
    url.trim().parse().ok()
}
