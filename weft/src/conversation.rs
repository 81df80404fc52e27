//! High-level conversation facade tying the crates together.
//!
//! One `Conversation` owns the run state of one chat thread: it starts runs
//! against the collaborator service, folds the event stream, answers HITL
//! questions, and rebuilds the timeline on demand.

use anyhow::{bail, Result};
use weft_hitl::{
    detect_unanswered_ask, AutoConfirm, AutoConfirmConfig, ConfirmRequest, HitlController,
    HitlPhase, StartRunRequest, WorkflowClient,
};
use weft_stream::{ingest_response, run_stream, run_with_retry, RunOutcome, RunState, StreamError};
use weft_timeline::{build_agent_timeline, AgentTimeline, TimelineInput};
use weft_types::{
    AskUserDialogState, AskUserResponse, ChatMessage, ImageTask, StreamConfig,
};

pub struct Conversation {
    client: WorkflowClient,
    config: StreamConfig,
    state: RunState,
    controller: HitlController,
    auto_confirm: AutoConfirm,
}

impl Conversation {
    pub fn new(client: WorkflowClient) -> Self {
        Self {
            client,
            config: StreamConfig::default(),
            state: RunState::new(),
            controller: HitlController::new(),
            auto_confirm: AutoConfirm::default(),
        }
    }

    /// Rebuild a conversation from a persisted transcript. The derived
    /// state (image tasks, tool ledger) is recovered by replaying the
    /// latest event snapshot; the persisted messages win over the replayed
    /// ones. An unanswered question reopens its dialog.
    pub fn from_history(client: WorkflowClient, messages: Vec<ChatMessage>) -> Self {
        let mut state = RunState::new();
        if let Some(events) = messages
            .iter()
            .rev()
            .find_map(|message| message.events.clone())
        {
            for event in events {
                state.apply(event);
            }
        }
        state.is_streaming = false;
        state.dialog.close();
        state.messages = messages;

        let mut conversation = Self {
            client,
            config: StreamConfig::default(),
            state,
            controller: HitlController::new(),
            auto_confirm: AutoConfirm::default(),
        };
        conversation.reconcile_dialog();
        conversation
    }

    pub fn with_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_auto_confirm(mut self, config: AutoConfirmConfig) -> Self {
        self.auto_confirm = AutoConfirm::new(config);
        self
    }

    /// Send a user instruction and drive the resulting run to completion or
    /// its first pause point. Transient connection failures are retried per
    /// the configured policy.
    pub async fn send(&mut self, request: StartRunRequest) -> Result<RunOutcome> {
        if self.state.is_streaming {
            bail!("a run is already active on this conversation");
        }
        self.state
            .push_message(ChatMessage::user(request.message.clone()));

        let client = &self.client;
        let config = &self.config;
        let outcome = run_with_retry(config, &mut self.state, || {
            let client = client.clone();
            let config = config.clone();
            let request = request.clone();
            async move {
                let response = client
                    .start_run(&request)
                    .await
                    .map_err(|err| StreamError::Transport(err.to_string()))?;
                Ok(ingest_response(response, config))
            }
        })
        .await?;

        self.controller.observe(&self.state.dialog);
        Ok(outcome)
    }

    /// Submit the current dialog selection and resume the paused run,
    /// appending its events to the existing log. The resume path does not
    /// retry: the confirmation was already delivered once.
    pub async fn answer(&mut self) -> Result<RunOutcome> {
        let request = self.controller.begin_submit(&mut self.state.dialog)?;
        self.state
            .push_message(ChatMessage::ask_answer(self.build_response(&request)));

        let response = self.client.resume(&request).await?;
        let events = ingest_response(response, self.config.clone());
        let outcome = run_stream(events, &mut self.state).await?;

        self.controller.mark_resumed();
        self.controller.observe(&self.state.dialog);
        Ok(outcome)
    }

    /// Run the auto-confirm policy against the open dialog, if any. Returns
    /// the outcome of the resumed run when an answer was auto-submitted.
    pub async fn maybe_auto_confirm(&mut self) -> Result<Option<RunOutcome>> {
        let Some(option_id) = self.auto_confirm.decide(&self.state.dialog) else {
            return Ok(None);
        };
        tokio::time::sleep(self.auto_confirm.config().debounce).await;
        if !self.state.dialog.is_open {
            return Ok(None);
        }
        self.state.dialog.select(&option_id);
        Ok(Some(self.answer().await?))
    }

    /// Close the dialog without answering; the server-side run stays
    /// paused.
    pub fn dismiss(&mut self) {
        self.controller.dismiss(&mut self.state.dialog);
    }

    /// Reconcile a conversation loaded from history: if its latest message
    /// is a question nobody answered, reopen the dialog identically.
    pub fn reconcile_dialog(&mut self) {
        if self.state.is_streaming || self.state.dialog.is_open {
            return;
        }
        if let Some(request) = detect_unanswered_ask(&self.state.messages) {
            self.state.dialog = AskUserDialogState::open(request);
            self.controller.observe(&self.state.dialog);
        }
    }

    /// Rebuild the timeline for the live assistant message.
    pub fn timeline(&self) -> AgentTimeline {
        let content = self
            .state
            .messages
            .iter()
            .rev()
            .find(|message| message.is_assistant())
            .map(|message| message.content.as_str())
            .unwrap_or_default();
        let tasks = self.state.images.to_vec();
        build_agent_timeline(
            &TimelineInput::new(&self.state.events)
                .with_message_content(content)
                .with_image_tasks(&tasks)
                .with_streaming(self.state.is_streaming)
                .with_last_assistant_message(true)
                .with_hitl_request(self.state.dialog.is_open)
                .with_stream_phase(self.state.phase.as_deref()),
        )
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.state.messages
    }

    pub fn image_tasks(&self) -> Vec<ImageTask> {
        self.state.images.to_vec()
    }

    pub fn dialog(&self) -> &AskUserDialogState {
        &self.state.dialog
    }

    pub fn dialog_mut(&mut self) -> &mut AskUserDialogState {
        &mut self.state.dialog
    }

    pub fn hitl_phase(&self) -> HitlPhase {
        self.controller.phase()
    }

    pub fn is_streaming(&self) -> bool {
        self.state.is_streaming
    }

    pub fn phase(&self) -> Option<&str> {
        self.state.phase.as_deref()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    fn build_response(&self, request: &ConfirmRequest) -> AskUserResponse {
        let mut context = serde_json::Map::new();
        context.insert(
            "threadId".to_string(),
            serde_json::Value::String(request.thread_id().to_string()),
        );

        match request {
            ConfirmRequest::AskUser { user_response, .. } => {
                let labels = user_response
                    .selected_ids
                    .iter()
                    .filter_map(|id| {
                        self.state
                            .dialog
                            .options
                            .iter()
                            .find(|option| &option.id == id)
                            .map(|option| option.label.clone())
                    })
                    .collect();
                AskUserResponse {
                    selected_ids: user_response.selected_ids.clone(),
                    selected_labels: labels,
                    custom_input: user_response.custom_input.clone(),
                    context: Some(context),
                }
            }
            ConfirmRequest::Content {
                action,
                user_feedback,
                ..
            } => {
                let id = match action {
                    weft_hitl::ConfirmAction::Approve => "approve",
                    weft_hitl::ConfirmAction::Reject => "reject",
                };
                AskUserResponse {
                    selected_ids: vec![id.to_string()],
                    selected_labels: Vec::new(),
                    custom_input: user_feedback.clone(),
                    context: Some(context),
                }
            }
        }
    }
}
