use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the workflow event log.
///
/// The wire tag is `type` in `snake_case`; payload fields are `camelCase`.
/// Timestamps are Unix epoch milliseconds. Events are append-only: once in
/// the log they are never mutated or removed, and all derived state can be
/// recomputed from the log alone.
///
/// Unrecognized tags deserialize into [`AgentEvent::Unknown`] so that new
/// event kinds degrade safely instead of failing the whole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    #[serde(rename_all = "camelCase")]
    AgentStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        conversation_id: Option<i64>,
    },

    #[serde(rename_all = "camelCase")]
    AgentEnd {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
    },

    #[serde(rename_all = "camelCase")]
    Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
    },

    /// Free-text phase update for the currently working agent.
    #[serde(rename_all = "camelCase")]
    Progress {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
    },

    #[serde(rename_all = "camelCase")]
    ToolCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_input: Option<Value>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
        /// Batch image generation: ids of the queued subtasks.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_ids: Option<Vec<u32>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompts: Option<Vec<String>>,
    },

    #[serde(rename_all = "camelCase")]
    ToolResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_output: Option<Value>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_ids: Option<Vec<u32>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompts: Option<Vec<String>>,
    },

    /// HITL pause point: the run is suspended until the user answers.
    #[serde(rename_all = "camelCase")]
    AskUser {
        #[serde(default)]
        question: String,
        #[serde(default)]
        options: Vec<AskUserOption>,
        #[serde(default)]
        selection_type: SelectionType,
        #[serde(default)]
        allow_custom_input: bool,
        #[serde(default)]
        thread_id: String,
        #[serde(default)]
        context: Map<String, Value>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
    },

    /// Normal suspension of the run. Never an error condition.
    #[serde(rename_all = "camelCase")]
    WorkflowPaused {
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
    },

    #[serde(rename_all = "camelCase")]
    ImageProgress {
        #[serde(default)]
        task_id: u32,
        #[serde(default)]
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_message: Option<String>,
        #[serde(default)]
        timestamp: i64,
    },

    #[serde(rename_all = "camelCase")]
    ContentUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tags: Option<Vec<String>>,
        #[serde(default)]
        timestamp: i64,
    },

    #[serde(rename_all = "camelCase")]
    WorkflowProgress {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phase: Option<String>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
    },

    #[serde(rename_all = "camelCase")]
    BriefReady {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        brief: Option<Value>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
    },

    #[serde(rename_all = "camelCase")]
    LayoutSpecReady {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        layout_spec: Option<Value>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
    },

    #[serde(rename_all = "camelCase")]
    AlignmentMapReady {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        paragraph_image_bindings: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body_blocks: Option<Value>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
    },

    #[serde(rename_all = "camelCase")]
    QualityScore {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quality_scores: Option<Value>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
    },

    /// Routing decision made by the orchestrator between stages.
    #[serde(rename_all = "camelCase")]
    SupervisorDecision {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        decision: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default)]
        content: String,
        #[serde(default)]
        timestamp: i64,
    },

    #[serde(rename_all = "camelCase")]
    WorkflowComplete {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tags: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_asset_ids: Option<Vec<i64>>,
        #[serde(default)]
        timestamp: i64,
    },

    /// Catch-all for event kinds this version does not know about.
    #[serde(other)]
    Unknown,
}

impl AgentEvent {
    /// Event timestamp in epoch milliseconds (0 for unknown events).
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::AgentStart { timestamp, .. }
            | Self::AgentEnd { timestamp, .. }
            | Self::Message { timestamp, .. }
            | Self::Progress { timestamp, .. }
            | Self::ToolCall { timestamp, .. }
            | Self::ToolResult { timestamp, .. }
            | Self::AskUser { timestamp, .. }
            | Self::WorkflowPaused { timestamp, .. }
            | Self::ImageProgress { timestamp, .. }
            | Self::ContentUpdate { timestamp, .. }
            | Self::WorkflowProgress { timestamp, .. }
            | Self::BriefReady { timestamp, .. }
            | Self::LayoutSpecReady { timestamp, .. }
            | Self::AlignmentMapReady { timestamp, .. }
            | Self::QualityScore { timestamp, .. }
            | Self::SupervisorDecision { timestamp, .. }
            | Self::WorkflowComplete { timestamp, .. } => *timestamp,
            Self::Unknown => 0,
        }
    }

    pub(crate) fn timestamp_mut(&mut self) -> Option<&mut i64> {
        match self {
            Self::AgentStart { timestamp, .. }
            | Self::AgentEnd { timestamp, .. }
            | Self::Message { timestamp, .. }
            | Self::Progress { timestamp, .. }
            | Self::ToolCall { timestamp, .. }
            | Self::ToolResult { timestamp, .. }
            | Self::AskUser { timestamp, .. }
            | Self::WorkflowPaused { timestamp, .. }
            | Self::ImageProgress { timestamp, .. }
            | Self::ContentUpdate { timestamp, .. }
            | Self::WorkflowProgress { timestamp, .. }
            | Self::BriefReady { timestamp, .. }
            | Self::LayoutSpecReady { timestamp, .. }
            | Self::AlignmentMapReady { timestamp, .. }
            | Self::QualityScore { timestamp, .. }
            | Self::SupervisorDecision { timestamp, .. }
            | Self::WorkflowComplete { timestamp, .. } => Some(timestamp),
            Self::Unknown => None,
        }
    }

    /// Agent key carried by the event, if any.
    pub fn agent(&self) -> Option<&str> {
        match self {
            Self::AgentStart { agent, .. }
            | Self::AgentEnd { agent, .. }
            | Self::Message { agent, .. }
            | Self::Progress { agent, .. }
            | Self::ToolCall { agent, .. }
            | Self::ToolResult { agent, .. }
            | Self::BriefReady { agent, .. }
            | Self::LayoutSpecReady { agent, .. }
            | Self::AlignmentMapReady { agent, .. }
            | Self::QualityScore { agent, .. } => agent.as_deref(),
            _ => None,
        }
    }

    /// Clamp each out-of-order timestamp to one past the running maximum,
    /// returning a repaired copy only when the input actually violates
    /// ordering. Upstream agent processes can be distributed; small clock
    /// skew would otherwise misbucket items during stage assignment. The
    /// strict bump keeps repaired timestamps in event order, so a clamped
    /// stage start can never tie with an item emitted before it.
    pub fn repair_timestamps(events: &[AgentEvent]) -> std::borrow::Cow<'_, [AgentEvent]> {
        let mut max = i64::MIN;
        let mut ordered = true;
        for event in events {
            let ts = event.timestamp();
            if ts < max {
                ordered = false;
                break;
            }
            max = max.max(ts);
        }
        if ordered {
            return std::borrow::Cow::Borrowed(events);
        }

        let mut repaired = events.to_vec();
        let mut max = i64::MIN;
        for event in &mut repaired {
            if let Some(ts) = event.timestamp_mut() {
                if *ts < max {
                    *ts = max + 1;
                }
                max = *ts;
            }
        }
        std::borrow::Cow::Owned(repaired)
    }
}

/// One selectable option of an `ask_user` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskUserOption {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionType {
    #[default]
    Single,
    Multiple,
    None,
}

/// The HITL question as carried on a chat message, so an unanswered ask can
/// be reopened when a conversation is loaded from history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskUserRequest {
    pub question: String,
    #[serde(default)]
    pub options: Vec<AskUserOption>,
    #[serde(default)]
    pub selection_type: SelectionType,
    #[serde(default)]
    pub allow_custom_input: bool,
    pub thread_id: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_agent_start_with_conversation_id() {
        let json = r#"{"type":"agent_start","agent":"writer_agent","content":"","timestamp":1000,"conversationId":42}"#;
        let event: AgentEvent = serde_json::from_str(json).unwrap();
        match event {
            AgentEvent::AgentStart {
                agent,
                conversation_id,
                timestamp,
                ..
            } => {
                assert_eq!(agent.as_deref(), Some("writer_agent"));
                assert_eq!(conversation_id, Some(42));
                assert_eq!(timestamp, 1000);
            }
            _ => panic!("Expected AgentStart variant"),
        }
    }

    #[test]
    fn test_deserialize_tool_result_with_batch_fields() {
        let json = r#"{"type":"tool_result","tool":"generate_images","taskIds":[1,2,3],"prompts":["a","b","c"],"timestamp":5}"#;
        let event: AgentEvent = serde_json::from_str(json).unwrap();
        match event {
            AgentEvent::ToolResult {
                tool,
                task_ids,
                prompts,
                ..
            } => {
                assert_eq!(tool.as_deref(), Some("generate_images"));
                assert_eq!(task_ids, Some(vec![1, 2, 3]));
                assert_eq!(prompts.map(|p| p.len()), Some(3));
            }
            _ => panic!("Expected ToolResult variant"),
        }
    }

    #[test]
    fn test_deserialize_ask_user_defaults() {
        let json = r#"{"type":"ask_user","question":"pick one","options":[{"id":"o1","label":"One"}],"threadId":"t-1","timestamp":10}"#;
        let event: AgentEvent = serde_json::from_str(json).unwrap();
        match event {
            AgentEvent::AskUser {
                question,
                options,
                selection_type,
                allow_custom_input,
                thread_id,
                ..
            } => {
                assert_eq!(question, "pick one");
                assert_eq!(options.len(), 1);
                assert_eq!(selection_type, SelectionType::Single);
                assert!(!allow_custom_input);
                assert_eq!(thread_id, "t-1");
            }
            _ => panic!("Expected AskUser variant"),
        }
    }

    #[test]
    fn test_unknown_event_type_is_ignored_variant() {
        let json = r#"{"type":"brand_new_thing","timestamp":9,"whatever":true}"#;
        let event: AgentEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, AgentEvent::Unknown);
    }

    #[test]
    fn test_serialize_uses_snake_case_tag() {
        let event = AgentEvent::WorkflowPaused {
            content: String::new(),
            timestamp: 1,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"workflow_paused\""));
    }

    #[test]
    fn test_repair_timestamps_clamps_regressions() {
        let events = vec![
            AgentEvent::Message {
                agent: None,
                content: "a".into(),
                timestamp: 100,
            },
            AgentEvent::Message {
                agent: None,
                content: "b".into(),
                timestamp: 40,
            },
            AgentEvent::Message {
                agent: None,
                content: "c".into(),
                timestamp: 150,
            },
        ];
        let repaired = AgentEvent::repair_timestamps(&events);
        let stamps: Vec<i64> = repaired.iter().map(|e| e.timestamp()).collect();
        assert_eq!(stamps, vec![100, 101, 150]);
    }

    #[test]
    fn test_repair_timestamps_borrows_when_ordered() {
        let events = vec![
            AgentEvent::Message {
                agent: None,
                content: "a".into(),
                timestamp: 1,
            },
            AgentEvent::Message {
                agent: None,
                content: "b".into(),
                timestamp: 2,
            },
        ];
        assert!(matches!(
            AgentEvent::repair_timestamps(&events),
            std::borrow::Cow::Borrowed(_)
        ));
    }
}
