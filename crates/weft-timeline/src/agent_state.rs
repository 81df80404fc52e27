//! Per-agent execution state derived from the event log.
//!
//! This is always recomputed from the full log, never incrementally
//! mutated, so it cannot drift from what a replay would produce.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use weft_types::{
    agents, is_internal_node, normalize_agent_key, AgentEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Working,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub agent_key: String,
    pub status: AgentStatus,
    pub start_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl AgentState {
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Scan the log and derive the state of every visible agent. `_tools`
/// helper keys are folded into their parent; internal routing nodes are
/// skipped entirely. An `agent_end` with no preceding start still yields a
/// completed state so late-joining logs do not lose agents.
pub fn agent_states(events: &[AgentEvent]) -> BTreeMap<String, AgentState> {
    let mut states: BTreeMap<String, AgentState> = BTreeMap::new();

    for event in events {
        let Some(raw_key) = event.agent() else {
            continue;
        };
        if is_internal_node(raw_key) {
            continue;
        }
        let key = normalize_agent_key(raw_key);

        match event {
            AgentEvent::AgentStart { timestamp, .. } => {
                states
                    .entry(key.to_string())
                    .or_insert_with(|| AgentState {
                        agent_key: key.to_string(),
                        status: AgentStatus::Working,
                        start_time: *timestamp,
                        end_time: None,
                        phase: None,
                        result: None,
                    });
            }
            AgentEvent::AgentEnd { timestamp, .. } => {
                let state = states.entry(key.to_string()).or_insert_with(|| AgentState {
                    agent_key: key.to_string(),
                    status: AgentStatus::Completed,
                    start_time: *timestamp,
                    end_time: None,
                    phase: None,
                    result: None,
                });
                state.status = AgentStatus::Completed;
                state.end_time = Some(*timestamp);
                state.result = extract_result(key, events);
            }
            AgentEvent::Progress { content, .. } => {
                if let Some(state) = states.get_mut(key) {
                    if !content.is_empty() {
                        state.phase = Some(content.clone());
                    }
                }
            }
            _ => {}
        }
    }

    states
}

/// Type-specific result extractor: re-scans the whole log for the latest
/// structured event belonging to this agent kind.
pub fn extract_result(agent_key: &str, events: &[AgentEvent]) -> Option<Value> {
    match agent_key {
        agents::BRIEF_COMPILER_AGENT => events.iter().rev().find_map(|event| match event {
            AgentEvent::BriefReady { brief, .. } => brief.clone(),
            _ => None,
        }),

        agents::LAYOUT_PLANNER_AGENT => events.iter().rev().find_map(|event| match event {
            AgentEvent::LayoutSpecReady { layout_spec, .. } => {
                let sections = normalize_layout_spec(layout_spec.as_ref())?;
                Some(json!({
                    "layoutSpec": sections,
                    "sectionCount": sections.len(),
                }))
            }
            _ => None,
        }),

        agents::IMAGE_PLANNER_AGENT | agents::REFERENCE_INTELLIGENCE_AGENT => {
            events.iter().rev().find_map(|event| match event {
                AgentEvent::AlignmentMapReady {
                    paragraph_image_bindings,
                    body_blocks,
                    ..
                } => {
                    if paragraph_image_bindings.is_none() && body_blocks.is_none() {
                        return None;
                    }
                    Some(json!({
                        "paragraphImageBindings": paragraph_image_bindings,
                        "bodyBlocks": body_blocks,
                        "bindingCount": value_len(paragraph_image_bindings.as_ref()),
                        "blockCount": value_len(body_blocks.as_ref()),
                    }))
                }
                _ => None,
            })
        }

        agents::REVIEW_AGENT => events.iter().rev().find_map(|event| match event {
            AgentEvent::QualityScore { quality_scores, .. } => quality_scores.clone(),
            _ => None,
        }),

        _ => None,
    }
}

/// The layout spec arrives as a bare array, `{layoutSpec: [...]}` or
/// `{items: [...]}`.
pub fn normalize_layout_spec(spec: Option<&Value>) -> Option<Vec<Value>> {
    let spec = spec?;
    if let Some(items) = spec.as_array() {
        return Some(items.clone());
    }
    spec.get("layoutSpec")
        .or_else(|| spec.get("items"))
        .and_then(Value::as_array)
        .cloned()
}

fn value_len(value: Option<&Value>) -> usize {
    match value {
        Some(Value::Array(items)) => items.len(),
        Some(Value::Object(map)) => map.len(),
        _ => 0,
    }
}
