//! # Weft - Agent Execution Stream Processor
//!
//! Weft ingests the event stream of a multi-agent content pipeline and
//! reconstructs what happened:
//!
//! - 🚰 **Stream ingestion** (SSE framing, activity timeouts, retries)
//! - 🧾 **Event reduction** (conversation text, tool ledger, image tasks)
//! - 🗂️ **Timeline reconstruction** (stages → agent groups → typed items)
//! - ⏸️ **Human-in-the-loop** (pause/resume protocol with validation)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use weft::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = WorkflowClient::new("http://localhost:8000");
//!     let mut conversation = Conversation::new(client);
//!
//!     let outcome = conversation
//!         .send(StartRunRequest::new("写一篇关于围炉煮茶的文章").with_hitl(true))
//!         .await?;
//!
//!     if outcome == RunOutcome::Paused {
//!         // The workflow asked a question; answer it and resume.
//!         conversation.dialog_mut().select("approve");
//!         conversation.answer().await?;
//!     }
//!
//!     let timeline = conversation.timeline();
//!     println!("stages: {}", timeline.history_stages.len() + 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! Weft consists of several composable crates:
//!
//! - **weft-types**: Core types (AgentEvent, ChatMessage, ImageTask, configs)
//! - **weft-stream**: SSE ingestion, event reduction, image-task tracking
//! - **weft-timeline**: Pure timeline reconstruction from the event log
//! - **weft-hitl**: Pause/resume state machine and the workflow HTTP client

pub mod conversation;

pub use conversation::Conversation;

// Re-export the component crates.
pub use weft_hitl as hitl;
pub use weft_stream as stream;
pub use weft_timeline as timeline;
pub use weft_types as types;

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use crate::conversation::Conversation;
    pub use weft_hitl::{
        AutoConfirmConfig, ConfirmAction, ConfirmRequest, HitlError, HitlPhase, StartRunRequest,
        WorkflowClient,
    };
    pub use weft_stream::{RunOutcome, RunState, StreamError};
    pub use weft_timeline::{build_agent_timeline, AgentTimeline, TimelineInput};
    pub use weft_types::{
        AgentEvent, AskUserDialogState, ChatMessage, ImageTask, ImageTaskStatus, StreamConfig,
    };
}
