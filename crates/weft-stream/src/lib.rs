//! Stream ingestion and event reduction for agent workflow runs.
//!
//! This crate turns the long-lived SSE response of a workflow run into
//! running conversation state:
//!
//! - [`ingest`] reassembles frames across chunk boundaries, parses events,
//!   and enforces the activity timeout.
//! - [`reducer`] folds each event into a [`RunState`] (assistant text, event
//!   log, dialog, tool ledger).
//! - [`image_tracker`] tracks image-generation subtasks with bucketed
//!   progress reporting.
//! - [`run`] drives a whole run, with a retry wrapper for transient
//!   connection failures.

pub mod error;
pub mod image_tracker;
pub mod ingest;
pub mod reducer;
pub mod run;
pub mod sse;

pub use error::StreamError;
pub use image_tracker::ImageTaskTracker;
pub use ingest::{ingest_bytes, ingest_response, EventStream};
pub use reducer::{format_content_block, RunState, ToolCallLedger, ToolInvocation};
pub use run::{run_stream, run_with_retry, RunOutcome};
pub use sse::{SseFrameBuffer, DONE_SENTINEL};
