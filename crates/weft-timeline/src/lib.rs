//! Deterministic timeline reconstruction from agent event logs.
//!
//! [`build_agent_timeline`] turns the flat, append-only event log of a
//! workflow run into a hierarchical view: stages led by one agent's turn,
//! per-agent groups inside each stage, and typed renderable items inside
//! each group. It is a pure function and is re-run on every appended event.
//!
//! The [`content`] and [`image_plan`] modules hold the tolerant parsers for
//! the semi-structured text agents emit.

pub mod agent_state;
pub mod builder;
pub mod content;
pub mod image_plan;

pub use agent_state::{agent_states, AgentState, AgentStatus};
pub use builder::{
    build_agent_timeline, AgentGroup, AgentTimeline, FinalContent, StageNode, StreamItem,
    StreamItemKind, TimelineInput,
};
pub use content::{parse_creative_content, parse_creative_content_or_plain, ParsedContent};
pub use image_plan::{parse_image_plan, ImagePlan, ImagePlanParse};
