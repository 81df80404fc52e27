//! Folds parsed events into running conversation state.
//!
//! `RunState::apply` is called once per event in arrival order. Everything it
//! produces can be re-derived from the event log alone, so reloading a
//! conversation and replaying its log yields the same state.

use crate::error::StreamError;
use crate::image_tracker::ImageTaskTracker;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use weft_types::{
    normalize_agent_key, stage_label, AgentEvent, AskUserDialogState, AskUserRequest, ChatMessage,
    GENERATE_IMAGES_TOOL,
};

/// One tool invocation reconstructed from `tool_call` / `tool_result` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool: String,
    pub input: Option<Value>,
    pub output: Option<Value>,
    pub raw_output: Option<String>,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub completed: bool,
}

/// Pairs results with the oldest pending call of the same normalized tool
/// name. When several same-named calls are in flight they are matched
/// strictly in call order; the wire carries no correlation id.
#[derive(Debug, Default, Clone)]
pub struct ToolCallLedger {
    invocations: Vec<ToolInvocation>,
    pending: BTreeMap<String, VecDeque<usize>>,
}

impl ToolCallLedger {
    pub fn begin(&mut self, tool: &str, input: Option<Value>, timestamp: i64) {
        let index = self.invocations.len();
        self.invocations.push(ToolInvocation {
            tool: tool.to_string(),
            input,
            output: None,
            raw_output: None,
            started_at: Some(timestamp),
            finished_at: None,
            completed: false,
        });
        self.pending
            .entry(tool.to_string())
            .or_default()
            .push_back(index);
    }

    /// A result with no pending call becomes a standalone completed
    /// invocation instead of an error.
    pub fn complete(
        &mut self,
        tool: &str,
        output: Option<Value>,
        raw_output: Option<String>,
        timestamp: i64,
    ) {
        let index = self
            .pending
            .get_mut(tool)
            .and_then(|queue| queue.pop_front());
        match index {
            Some(index) => {
                let invocation = &mut self.invocations[index];
                invocation.output = output;
                invocation.raw_output = raw_output;
                invocation.finished_at = Some(timestamp);
                invocation.completed = true;
            }
            None => self.invocations.push(ToolInvocation {
                tool: tool.to_string(),
                input: None,
                output,
                raw_output,
                started_at: None,
                finished_at: Some(timestamp),
                completed: true,
            }),
        }
    }

    pub fn invocations(&self) -> &[ToolInvocation] {
        &self.invocations
    }

    pub fn pending_count(&self, tool: &str) -> usize {
        self.pending.get(tool).map_or(0, VecDeque::len)
    }
}

/// Running state of one workflow run on one conversation.
#[derive(Debug, Clone)]
pub struct RunState {
    pub messages: Vec<ChatMessage>,
    pub events: Vec<AgentEvent>,
    pub images: ImageTaskTracker,
    pub dialog: AskUserDialogState,
    pub tools: ToolCallLedger,
    pub is_streaming: bool,
    pub phase: Option<String>,
    pub conversation_id: Option<i64>,
    pub stages_completed: u32,
    pub completed: bool,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            events: Vec::new(),
            images: ImageTaskTracker::new(),
            dialog: AskUserDialogState::default(),
            tools: ToolCallLedger::default(),
            is_streaming: false,
            phase: None,
            conversation_id: None,
            stages_completed: 0,
            completed: false,
            started_at: chrono::Utc::now(),
        }
    }

    /// Mark the start of a (new or resumed) streaming run. The event log is
    /// kept: the confirm path appends to it rather than replacing it.
    pub fn begin_run(&mut self) {
        self.is_streaming = true;
        self.completed = false;
        self.started_at = chrono::Utc::now();
    }

    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Apply one event: append it to the log and fold its effect into the
    /// conversation state.
    pub fn apply(&mut self, event: AgentEvent) {
        match &event {
            AgentEvent::AgentStart {
                agent,
                conversation_id,
                ..
            } => {
                if self.conversation_id.is_none() {
                    self.conversation_id = *conversation_id;
                }
                if let Some(label) = agent
                    .as_deref()
                    .and_then(|key| stage_label(normalize_agent_key(key)))
                {
                    self.append_assistant_text(&format!("{label} started"));
                    self.phase = Some(label.to_string());
                }
            }

            AgentEvent::AgentEnd { agent, .. } => {
                if let Some(label) = agent
                    .as_deref()
                    .and_then(|key| stage_label(normalize_agent_key(key)))
                {
                    self.append_assistant_text(&format!("{label} finished"));
                    self.stages_completed += 1;
                }
            }

            AgentEvent::Message { content, .. } => {
                if !content.is_empty() {
                    self.append_assistant_text(content);
                }
            }

            AgentEvent::Progress { content, .. } => {
                self.phase = non_empty(content);
            }

            AgentEvent::ToolCall {
                tool,
                tool_input,
                task_ids,
                prompts,
                timestamp,
                ..
            } => {
                let name = normalize_tool_name(tool.as_deref());
                self.tools.begin(&name, tool_input.clone(), *timestamp);
                if name == GENERATE_IMAGES_TOOL {
                    if let Some(ids) = task_ids {
                        let prompts = prompts.clone().unwrap_or_default();
                        self.images.register_batch(ids, &prompts);
                    }
                }
            }

            AgentEvent::ToolResult {
                tool,
                tool_output,
                content,
                timestamp,
                task_ids,
                prompts,
                ..
            } => {
                let name = normalize_tool_name(tool.as_deref());
                let (output, raw) = match tool_output {
                    Some(value) => (Some(value.clone()), None),
                    None => match serde_json::from_str::<Value>(content) {
                        Ok(value) => (Some(value), None),
                        Err(_) => (None, non_empty(content)),
                    },
                };
                self.tools.complete(&name, output, raw, *timestamp);
                // Some backends only attach the batch to the result frame.
                if name == GENERATE_IMAGES_TOOL {
                    if let Some(ids) = task_ids {
                        let prompts = prompts.clone().unwrap_or_default();
                        self.images.register_batch(ids, &prompts);
                    }
                }
            }

            AgentEvent::AskUser {
                question,
                options,
                selection_type,
                allow_custom_input,
                thread_id,
                context,
                ..
            } => {
                let request = AskUserRequest {
                    question: question.clone(),
                    options: options.clone(),
                    selection_type: *selection_type,
                    allow_custom_input: *allow_custom_input,
                    thread_id: thread_id.clone(),
                    context: context.clone(),
                };
                self.ensure_assistant().ask_user = Some(request.clone());
                self.dialog = AskUserDialogState::open(request);
            }

            AgentEvent::WorkflowPaused { .. } => {
                self.is_streaming = false;
                self.phase = None;
            }

            AgentEvent::ImageProgress {
                task_id,
                status,
                progress,
                url,
                error_message,
                ..
            } => {
                if let Some(line) = self.images.apply_progress(
                    *task_id,
                    status,
                    *progress,
                    url.as_deref(),
                    error_message.as_deref(),
                ) {
                    self.append_assistant_text(&line);
                }
            }

            AgentEvent::ContentUpdate {
                title, body, tags, ..
            } => {
                let block = format_content_block(
                    title.as_deref().unwrap_or_default(),
                    body.as_deref(),
                    tags.as_deref().unwrap_or_default(),
                );
                self.ensure_assistant().content = block;
            }

            AgentEvent::WorkflowProgress { phase, content, .. } => {
                self.phase = phase.clone().or_else(|| non_empty(content));
            }

            AgentEvent::BriefReady { .. } => {
                self.append_assistant_text("Content brief compiled");
            }

            AgentEvent::LayoutSpecReady { layout_spec, .. } => {
                let count = layout_spec_len(layout_spec.as_ref());
                match count {
                    Some(count) => self
                        .append_assistant_text(&format!("Layout plan ready, {count} sections")),
                    None => self.append_assistant_text("Layout plan ready"),
                }
            }

            AgentEvent::AlignmentMapReady { .. } => {
                self.append_assistant_text("Paragraph/image alignment map ready");
            }

            AgentEvent::QualityScore { quality_scores, .. } => {
                if let Some(summary) = format_quality_scores(quality_scores.as_ref()) {
                    self.append_assistant_text(&summary);
                }
            }

            AgentEvent::WorkflowComplete {
                content,
                title,
                body,
                tags,
                image_asset_ids,
                ..
            } => {
                self.is_streaming = false;
                self.phase = None;
                self.completed = true;
                let final_text = match title {
                    Some(title) => format_content_block(
                        title,
                        body.as_deref(),
                        tags.as_deref().unwrap_or_default(),
                    ),
                    None => content.clone(),
                };
                if !final_text.is_empty() {
                    self.ensure_assistant().content = final_text;
                }
                self.images
                    .reconcile_complete(image_asset_ids.as_deref().unwrap_or_default());
            }

            AgentEvent::SupervisorDecision { .. } | AgentEvent::Unknown => {}
        }

        self.events.push(event);
        if let Some(message) = self.messages.last_mut().filter(|m| m.is_assistant()) {
            message.events = Some(self.events.clone());
        }
    }

    /// Fatal stream error: close the run and surface a user-visible line.
    pub fn mark_failed(&mut self, error: &StreamError) {
        self.is_streaming = false;
        self.phase = None;
        let message = error.user_message();
        self.append_assistant_text(&message);
        tracing::error!(error = %error, "run aborted");
    }

    fn ensure_assistant(&mut self) -> &mut ChatMessage {
        if !self.messages.last().is_some_and(ChatMessage::is_assistant) {
            self.messages.push(ChatMessage::assistant(""));
        }
        let last = self.messages.len() - 1;
        &mut self.messages[last]
    }

    fn append_assistant_text(&mut self, text: &str) {
        let message = self.ensure_assistant();
        if message.content.is_empty() {
            message.content = text.to_string();
        } else {
            message.content.push_str("\n\n");
            message.content.push_str(text);
        }
    }
}

/// The wire content convention of the pipeline: title and tag lines use the
/// upstream Chinese labels, tags are space-joined `#token` words.
pub fn format_content_block(title: &str, body: Option<&str>, tags: &[String]) -> String {
    let mut block = format!("标题: {title}");
    if let Some(body) = body.filter(|b| !b.is_empty()) {
        block.push_str("\n\n");
        block.push_str(body);
    }
    if !tags.is_empty() {
        let tags: Vec<String> = tags.iter().map(|tag| format!("#{tag}")).collect();
        block.push_str("\n\n标签: ");
        block.push_str(&tags.join(" "));
    }
    block
}

fn normalize_tool_name(tool: Option<&str>) -> String {
    tool.unwrap_or("unknown_tool").trim().to_ascii_lowercase()
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn layout_spec_len(spec: Option<&Value>) -> Option<usize> {
    let spec = spec?;
    if let Some(items) = spec.as_array() {
        return Some(items.len());
    }
    spec.get("layoutSpec")
        .or_else(|| spec.get("items"))
        .and_then(Value::as_array)
        .map(Vec::len)
}

fn format_quality_scores(scores: Option<&Value>) -> Option<String> {
    let scores = scores?.as_object()?;
    if scores.is_empty() {
        return None;
    }
    let mut lines = vec!["Quality review scores:".to_string()];
    for (metric, score) in scores {
        lines.push(format!("{metric}: {score}"));
    }
    Some(lines.join("\n"))
}
