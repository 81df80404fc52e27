//! HTTP client for the collaborator workflow service.
//!
//! Both endpoints answer with a long-lived SSE body; the raw `Response` is
//! handed to the stream ingestor untouched.

use crate::error::HitlError;
use crate::request::ConfirmRequest;
use serde::Serialize;

const STREAM_PATH: &str = "/api/agent/stream";
const CONFIRM_PATH: &str = "/api/agent/confirm";

/// Parameters for starting a fresh workflow run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRunRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_gen_provider: Option<String>,
    pub enable_hitl: bool,
}

impl StartRunRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_theme(mut self, theme_id: i64) -> Self {
        self.theme_id = Some(theme_id);
        self
    }

    pub fn with_reference_images(mut self, images: Vec<String>) -> Self {
        self.reference_images = images;
        self
    }

    pub fn with_image_gen_provider(mut self, provider: impl Into<String>) -> Self {
        self.image_gen_provider = Some(provider.into());
        self
    }

    pub fn with_hitl(mut self, enabled: bool) -> Self {
        self.enable_hitl = enabled;
        self
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowClient {
    http: reqwest::Client,
    base_url: String,
}

impl WorkflowClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Start a new run. The response body is the event stream.
    pub async fn start_run(
        &self,
        request: &StartRunRequest,
    ) -> Result<reqwest::Response, HitlError> {
        self.post(STREAM_PATH, request).await
    }

    /// Resume a paused run with the user's confirmation. The response body
    /// is the continuation of the event stream.
    pub async fn resume(&self, request: &ConfirmRequest) -> Result<reqwest::Response, HitlError> {
        tracing::info!(thread_id = %request.thread_id(), "resuming paused run");
        self.post(CONFIRM_PATH, request).await
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, HitlError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(HitlError::Transport(format!(
                "{url} returned {status}: {detail}"
            )));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_run_payload_shape() {
        let request = StartRunRequest::new("写一篇关于围炉煮茶的文章")
            .with_theme(3)
            .with_hitl(true);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["message"], "写一篇关于围炉煮茶的文章");
        assert_eq!(json["themeId"], 3);
        assert_eq!(json["enableHitl"], true);
        assert!(json.get("referenceImages").is_none());
    }
}
