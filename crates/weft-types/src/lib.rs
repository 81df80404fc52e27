//! Core types for the Weft agent execution stream.
//!
//! The upstream pipeline reports progress as a flat, append-only log of
//! typed events carried over SSE. This crate defines that event model plus
//! the conversation-scoped structures built on top of it: chat messages,
//! image generation tasks, the HITL dialog state, and the configuration
//! knobs shared by the stream layer.

pub mod agents;
pub mod config;
pub mod dialog;
pub mod events;
pub mod image;
pub mod message;

pub use agents::{
    display_name, is_internal_node, is_tools_helper, normalize_agent_key, stage_label,
    GENERATE_IMAGES_TOOL,
};
pub use config::StreamConfig;
pub use dialog::{AskUserDialogState, HITL_CONTEXT_MARKER};
pub use events::{AgentEvent, AskUserOption, AskUserRequest, SelectionType};
pub use image::{extract_asset_id, ImageTask, ImageTaskStatus};
pub use message::{AskUserResponse, ChatMessage, Role};
