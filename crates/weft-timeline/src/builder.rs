//! Reconstruction of the hierarchical execution timeline from the flat
//! event log.
//!
//! `build_agent_timeline` is a pure function: identical inputs produce
//! structurally identical output. It is re-run on every appended event
//! during live streaming, so everything here iterates in deterministic
//! order (ordered maps, stable sorts) and touches no clocks or randomness.

use crate::agent_state::{agent_states, AgentState, AgentStatus};
use crate::content::{parse_creative_content, parse_creative_content_or_plain};
use crate::image_plan::parse_image_plan;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use weft_types::{
    agents, display_name, is_internal_node, is_tools_helper, normalize_agent_key, AgentEvent,
    ImageTask, ImageTaskStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamItemKind {
    Tool,
    Result,
    Content,
    ImagePlan,
    Status,
}

impl StreamItemKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Tool => "tool",
            Self::Result => "result",
            Self::Content => "content",
            Self::ImagePlan => "image_plan",
            Self::Status => "status",
        }
    }
}

/// One renderable row of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamItem {
    pub id: String,
    pub kind: StreamItemKind,
    pub title: String,
    pub timestamp: i64,
    pub agent_key: String,
    pub agent_label: String,
    pub payload: Value,
}

impl StreamItem {
    fn new(kind: StreamItemKind, title: impl Into<String>, timestamp: i64, agent_key: &str, payload: Value) -> Self {
        Self {
            id: String::new(),
            kind,
            title: title.into(),
            timestamp,
            agent_key: agent_key.to_string(),
            agent_label: display_name(agent_key),
            payload,
        }
    }

    fn is_working_marker(&self) -> bool {
        self.kind == StreamItemKind::Status
            && self.payload.get("working").and_then(Value::as_bool) == Some(true)
    }
}

/// The items one agent produced within one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentGroup {
    pub agent_key: String,
    pub agent_label: String,
    pub items: Vec<StreamItem>,
    pub status: AgentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

/// A contiguous span of activity led by one top-level agent's turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageNode {
    pub lead_agent: String,
    pub groups: Vec<AgentGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_label: Option<String>,
    pub status: AgentStatus,
    pub started_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalContent {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub image_tasks: Vec<ImageTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTimeline {
    pub current_stage: StageNode,
    pub history_stages: Vec<StageNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_content: Option<FinalContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_decision_label: Option<String>,
    pub has_outputs: bool,
}

/// Ancillary flags accompanying the event log.
#[derive(Debug, Clone, Default)]
pub struct TimelineInput<'a> {
    pub events: &'a [AgentEvent],
    pub message_content: &'a str,
    pub image_tasks: &'a [ImageTask],
    pub is_streaming: bool,
    pub is_historical_message: bool,
    pub is_last_assistant_message: bool,
    pub is_hitl_request: bool,
    pub stream_phase: Option<&'a str>,
}

impl<'a> TimelineInput<'a> {
    pub fn new(events: &'a [AgentEvent]) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn with_message_content(mut self, content: &'a str) -> Self {
        self.message_content = content;
        self
    }

    pub fn with_image_tasks(mut self, tasks: &'a [ImageTask]) -> Self {
        self.image_tasks = tasks;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.is_streaming = streaming;
        self
    }

    pub fn with_historical_message(mut self, historical: bool) -> Self {
        self.is_historical_message = historical;
        self
    }

    pub fn with_last_assistant_message(mut self, last: bool) -> Self {
        self.is_last_assistant_message = last;
        self
    }

    pub fn with_hitl_request(mut self, hitl: bool) -> Self {
        self.is_hitl_request = hitl;
        self
    }

    pub fn with_stream_phase(mut self, phase: Option<&'a str>) -> Self {
        self.stream_phase = phase;
        self
    }
}

struct StageSeed {
    lead_agent: String,
    started_at: i64,
    decision_label: Option<String>,
}

/// Rebuild the whole timeline from the log plus ancillary flags.
pub fn build_agent_timeline(input: &TimelineInput<'_>) -> AgentTimeline {
    // Distributed agent processes can report skewed clocks; clamp any
    // timestamp regression to the running maximum before bucketing.
    let events = AgentEvent::repair_timestamps(input.events);
    let events: &[AgentEvent] = &events;
    let states = agent_states(events);

    let mut items = collect_items(events, &states, input);
    items.retain(|item| item.timestamp > 0);
    items.sort_by_key(|item| item.timestamp);
    for (index, item) in items.iter_mut().enumerate() {
        item.id = format!("{}-{}-{}", item.kind.as_str(), item.agent_key, index);
    }

    let seeds = stage_seeds(events);
    let mut stages = assign_stages(seeds, items, &states);
    stages.retain(|stage| !stage.groups.is_empty());

    let final_content = build_final_content(events, input);

    let current_stage = match stages.pop() {
        Some(stage) => stage,
        None => StageNode {
            lead_agent: "pre".to_string(),
            groups: Vec::new(),
            decision_label: None,
            status: AgentStatus::Working,
            started_at: 0,
            ended_at: None,
        },
    };

    let has_outputs =
        final_content.is_some() || !current_stage.groups.is_empty() || !stages.is_empty();

    AgentTimeline {
        next_decision_label: next_decision_label(events),
        history_stages: stages,
        current_stage,
        final_content,
        has_outputs,
    }
}

fn collect_items(
    events: &[AgentEvent],
    states: &BTreeMap<String, AgentState>,
    input: &TimelineInput<'_>,
) -> Vec<StreamItem> {
    let mut items = Vec::new();

    if let Some((brief, ts)) = latest_brief(events) {
        items.push(StreamItem::new(
            StreamItemKind::Result,
            "Content brief",
            ts,
            agents::BRIEF_COMPILER_AGENT,
            brief,
        ));
    }

    if let Some(item) = research_bundle(events) {
        items.push(item);
    }

    // Live preview of the draft; suppressed once the run is finalized (the
    // final card would duplicate it) and for historical messages.
    let finalized = events
        .iter()
        .any(|event| matches!(event, AgentEvent::WorkflowComplete { .. }));
    if !finalized && !input.is_historical_message {
        if let Some(item) = content_preview(events) {
            items.push(item);
        }
    }

    if let Some(item) = image_plan_item(events) {
        items.push(item);
    }

    if let Some((spec, ts)) = latest_layout_spec(events) {
        items.push(StreamItem::new(
            StreamItemKind::Result,
            "Layout plan",
            ts,
            agents::LAYOUT_PLANNER_AGENT,
            spec,
        ));
    }

    if let Some((map, agent, ts)) = latest_alignment_map(events) {
        items.push(StreamItem::new(
            StreamItemKind::Result,
            "Paragraph/image alignment",
            ts,
            &agent,
            map,
        ));
    }

    if let Some((scores, ts)) = latest_quality_score(events) {
        items.push(StreamItem::new(
            StreamItemKind::Result,
            "Quality review",
            ts,
            agents::REVIEW_AGENT,
            scores,
        ));
    }

    // Agents not represented so far still get a row: a terse "completed"
    // marker, or a working indicator while they are active.
    let covered: Vec<String> = items.iter().map(|item| item.agent_key.clone()).collect();
    let live = (input.is_streaming || input.is_hitl_request) && input.is_last_assistant_message;
    for (key, state) in states {
        match state.status {
            AgentStatus::Completed if !covered.contains(key) => {
                items.push(StreamItem::new(
                    StreamItemKind::Status,
                    format!("{} completed", display_name(key)),
                    state.end_time.unwrap_or(state.start_time),
                    key,
                    json!({"working": false}),
                ));
            }
            AgentStatus::Working if live => {
                let title = state
                    .phase
                    .clone()
                    .or_else(|| input.stream_phase.map(str::to_string))
                    .unwrap_or_else(|| format!("{} working", display_name(key)));
                items.push(StreamItem::new(
                    StreamItemKind::Status,
                    title,
                    state.start_time,
                    key,
                    json!({"working": true}),
                ));
            }
            AgentStatus::Working if !covered.contains(key) => {
                // Run is no longer live; show the agent without a spinner.
                items.push(StreamItem::new(
                    StreamItemKind::Status,
                    display_name(key),
                    state.start_time,
                    key,
                    json!({"working": false}),
                ));
            }
            _ => {}
        }
    }

    items
}

fn latest_brief(events: &[AgentEvent]) -> Option<(Value, i64)> {
    events.iter().rev().find_map(|event| match event {
        AgentEvent::BriefReady {
            brief: Some(brief),
            timestamp,
            ..
        } => Some((brief.clone(), *timestamp)),
        _ => None,
    })
}

/// All research tool activity collapses into one bundle item instead of one
/// row per call.
fn research_bundle(events: &[AgentEvent]) -> Option<StreamItem> {
    let mut tools: Vec<Value> = Vec::new();
    let mut notes: Vec<&str> = Vec::new();
    let mut first_ts = 0i64;

    for event in events {
        let Some(agent) = event.agent() else { continue };
        if normalize_agent_key(agent) != agents::RESEARCH_EVIDENCE_AGENT {
            continue;
        }
        match event {
            AgentEvent::ToolCall {
                tool, timestamp, ..
            } => {
                tools.push(json!({
                    "tool": tool.clone().unwrap_or_default(),
                    "completed": false,
                }));
                if first_ts == 0 {
                    first_ts = *timestamp;
                }
            }
            AgentEvent::ToolResult { tool, timestamp, .. } => {
                let name = tool.clone().unwrap_or_default();
                let pending = tools.iter_mut().find(|entry| {
                    entry.get("tool").and_then(Value::as_str) == Some(name.as_str())
                        && entry.get("completed").and_then(Value::as_bool) == Some(false)
                });
                match pending {
                    Some(entry) => entry["completed"] = Value::Bool(true),
                    None => tools.push(json!({"tool": name, "completed": true})),
                }
                if first_ts == 0 {
                    first_ts = *timestamp;
                }
            }
            AgentEvent::Message {
                content, timestamp, ..
            } if !content.is_empty() => {
                notes.push(content);
                if first_ts == 0 {
                    first_ts = *timestamp;
                }
            }
            _ => {}
        }
    }

    if tools.is_empty() && notes.is_empty() {
        return None;
    }
    Some(StreamItem::new(
        StreamItemKind::Tool,
        "Evidence research",
        first_ts,
        agents::RESEARCH_EVIDENCE_AGENT,
        json!({"tools": tools, "notes": notes.join("\n\n")}),
    ))
}

fn content_preview(events: &[AgentEvent]) -> Option<StreamItem> {
    let mut text = String::new();
    let mut last_ts = 0i64;
    for event in events {
        if let AgentEvent::Message {
            agent: Some(agent),
            content,
            timestamp,
        } = event
        {
            if normalize_agent_key(agent) == agents::WRITER_AGENT && !content.is_empty() {
                if !text.is_empty() {
                    text.push_str("\n\n");
                }
                text.push_str(content);
                last_ts = *timestamp;
            }
        }
    }
    let parsed = parse_creative_content_or_plain(&text)?;
    let payload = serde_json::to_value(&parsed).ok()?;
    Some(StreamItem::new(
        StreamItemKind::Content,
        parsed.title,
        last_ts,
        agents::WRITER_AGENT,
        payload,
    ))
}

fn image_plan_item(events: &[AgentEvent]) -> Option<StreamItem> {
    let mut text = String::new();
    let mut last_ts = 0i64;
    for event in events {
        if let AgentEvent::Message {
            agent: Some(agent),
            content,
            timestamp,
        } = event
        {
            if normalize_agent_key(agent) == agents::IMAGE_PLANNER_AGENT && !content.is_empty() {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(content);
                last_ts = *timestamp;
            }
        }
    }
    let parsed = parse_image_plan(&text)?;
    let payload = serde_json::to_value(&parsed).ok()?;
    Some(StreamItem::new(
        StreamItemKind::ImagePlan,
        "Image plan",
        last_ts,
        agents::IMAGE_PLANNER_AGENT,
        payload,
    ))
}

fn latest_layout_spec(events: &[AgentEvent]) -> Option<(Value, i64)> {
    events.iter().rev().find_map(|event| match event {
        AgentEvent::LayoutSpecReady {
            layout_spec: Some(spec),
            timestamp,
            ..
        } => Some((spec.clone(), *timestamp)),
        _ => None,
    })
}

fn latest_alignment_map(events: &[AgentEvent]) -> Option<(Value, String, i64)> {
    events.iter().rev().find_map(|event| match event {
        AgentEvent::AlignmentMapReady {
            agent,
            paragraph_image_bindings,
            body_blocks,
            timestamp,
            ..
        } => {
            if paragraph_image_bindings.is_none() && body_blocks.is_none() {
                return None;
            }
            let key = agent
                .as_deref()
                .map(normalize_agent_key)
                .unwrap_or(agents::IMAGE_PLANNER_AGENT)
                .to_string();
            Some((
                json!({
                    "paragraphImageBindings": paragraph_image_bindings,
                    "bodyBlocks": body_blocks,
                }),
                key,
                *timestamp,
            ))
        }
        _ => None,
    })
}

fn latest_quality_score(events: &[AgentEvent]) -> Option<(Value, i64)> {
    events.iter().rev().find_map(|event| match event {
        AgentEvent::QualityScore {
            quality_scores: Some(scores),
            timestamp,
            ..
        } => Some((scores.clone(), *timestamp)),
        _ => None,
    })
}

/// Every visible top-level `agent_start` begins a stage; the nearest
/// preceding routing decision becomes its label.
fn stage_seeds(events: &[AgentEvent]) -> Vec<StageSeed> {
    let mut seeds = Vec::new();
    let mut last_decision: Option<String> = None;

    for event in events {
        match event {
            AgentEvent::SupervisorDecision { .. } => {
                last_decision = decision_label(event);
            }
            AgentEvent::AgentStart {
                agent: Some(agent),
                timestamp,
                ..
            } => {
                if is_internal_node(agent) || is_tools_helper(agent) {
                    continue;
                }
                seeds.push(StageSeed {
                    lead_agent: normalize_agent_key(agent).to_string(),
                    started_at: *timestamp,
                    decision_label: last_decision.take(),
                });
            }
            _ => {}
        }
    }
    seeds
}

fn decision_label(event: &AgentEvent) -> Option<String> {
    let AgentEvent::SupervisorDecision {
        decision,
        reason,
        content,
        ..
    } = event
    else {
        return None;
    };
    decision
        .as_deref()
        .map(display_name)
        .or_else(|| reason.clone())
        .or_else(|| {
            if content.is_empty() {
                None
            } else {
                Some(content.clone())
            }
        })
}

fn assign_stages(
    seeds: Vec<StageSeed>,
    items: Vec<StreamItem>,
    states: &BTreeMap<String, AgentState>,
) -> Vec<StageNode> {
    let mut seeds = seeds;

    // Items older than the first stage start get a synthetic leading stage.
    let needs_preparation = match seeds.first() {
        Some(first) => items.iter().any(|item| item.timestamp < first.started_at),
        None => !items.is_empty(),
    };
    if needs_preparation {
        let earliest = items.iter().map(|item| item.timestamp).min().unwrap_or(0);
        seeds.insert(
            0,
            StageSeed {
                lead_agent: "pre".to_string(),
                started_at: earliest,
                decision_label: None,
            },
        );
    }

    let mut buckets: Vec<Vec<StreamItem>> = seeds.iter().map(|_| Vec::new()).collect();
    for item in items {
        let index = seeds
            .iter()
            .rposition(|seed| seed.started_at <= item.timestamp)
            .unwrap_or(0);
        buckets[index].push(item);
    }

    seeds
        .into_iter()
        .zip(buckets)
        .map(|(seed, bucket)| build_stage(seed, bucket, states))
        .collect()
}

fn build_stage(
    seed: StageSeed,
    items: Vec<StreamItem>,
    states: &BTreeMap<String, AgentState>,
) -> StageNode {
    let mut by_agent: BTreeMap<String, Vec<StreamItem>> = BTreeMap::new();
    for item in items {
        by_agent.entry(item.agent_key.clone()).or_default().push(item);
    }

    let mut groups: Vec<AgentGroup> = by_agent
        .into_iter()
        .map(|(key, items)| {
            let working = items.iter().any(StreamItem::is_working_marker);
            let state = states.get(&key);
            AgentGroup {
                agent_label: display_name(&key),
                agent_key: key,
                status: if working {
                    AgentStatus::Working
                } else {
                    AgentStatus::Completed
                },
                duration_ms: state.and_then(AgentState::duration_ms),
                items,
            }
        })
        .collect();
    groups.sort_by_key(|group| {
        group
            .items
            .iter()
            .map(|item| item.timestamp)
            .min()
            .unwrap_or(i64::MAX)
    });

    let status = if groups
        .iter()
        .any(|group| group.status == AgentStatus::Working)
    {
        AgentStatus::Working
    } else {
        AgentStatus::Completed
    };
    let ended_at = states.get(&seed.lead_agent).and_then(|state| state.end_time);

    StageNode {
        lead_agent: seed.lead_agent,
        groups,
        decision_label: seed.decision_label,
        status,
        started_at: seed.started_at,
        ended_at,
    }
}

fn build_final_content(
    events: &[AgentEvent],
    input: &TimelineInput<'_>,
) -> Option<FinalContent> {
    let complete = events.iter().rev().find_map(|event| match event {
        AgentEvent::WorkflowComplete {
            content,
            title,
            body,
            tags,
            image_asset_ids,
            ..
        } => Some((content, title, body, tags, image_asset_ids)),
        _ => None,
    })?;
    let (content, title, body, tags, image_asset_ids) = complete;

    let (title, body, tags) = match title {
        Some(title) => (
            title.clone(),
            body.clone().unwrap_or_default(),
            tags.clone().unwrap_or_default(),
        ),
        None => {
            let parsed = parse_creative_content(content)
                .or_else(|| parse_creative_content(input.message_content))?;
            (parsed.title, parsed.body, parsed.tags)
        }
    };

    Some(FinalContent {
        title,
        body,
        tags,
        image_tasks: final_image_tasks(image_asset_ids.as_deref(), input.image_tasks),
    })
}

fn final_image_tasks(asset_ids: Option<&[i64]>, supplied: &[ImageTask]) -> Vec<ImageTask> {
    match asset_ids {
        Some(ids) => ids
            .iter()
            .enumerate()
            .map(|(index, &asset_id)| {
                let mut task = supplied
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| ImageTask {
                        id: index as u32 + 1,
                        ..ImageTask::default()
                    });
                task.status = ImageTaskStatus::Done;
                task.asset_id = Some(asset_id);
                task
            })
            .collect(),
        None => {
            if !supplied.is_empty()
                && supplied
                    .iter()
                    .all(|task| task.status == ImageTaskStatus::Done)
            {
                supplied.to_vec()
            } else {
                Vec::new()
            }
        }
    }
}

/// A routing decision newer than the latest stage start is a "what's next"
/// hint for a stage that has not begun yet.
fn next_decision_label(events: &[AgentEvent]) -> Option<String> {
    let latest_start = events
        .iter()
        .filter_map(|event| match event {
            AgentEvent::AgentStart {
                agent: Some(agent),
                timestamp,
                ..
            } if !is_internal_node(agent) => Some(*timestamp),
            _ => None,
        })
        .max()
        .unwrap_or(i64::MIN);

    events.iter().rev().find_map(|event| match event {
        AgentEvent::SupervisorDecision { timestamp, .. } if *timestamp > latest_start => {
            decision_label(event)
        }
        _ => None,
    })
}
