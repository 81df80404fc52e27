//! Human-in-the-loop pause/resume protocol.
//!
//! A workflow can suspend itself with an `ask_user` event and wait for the
//! user. This crate holds everything around that pause point:
//!
//! - [`HitlController`] — the `Idle → AwaitingUser → Submitting → Resumed`
//!   state machine, including the validation gate for content confirms.
//! - [`AutoConfirm`] — the optional auto-answer policy with its loop guard.
//! - [`detect_unanswered_ask`] — reopening the dialog when a historical
//!   conversation still has a pending question.
//! - [`WorkflowClient`] — the HTTP client for the start and confirm
//!   endpoints of the collaborator service.

pub mod auto_confirm;
pub mod client;
pub mod controller;
pub mod error;
pub mod request;
pub mod resume;

pub use auto_confirm::{AutoConfirm, AutoConfirmConfig};
pub use client::{StartRunRequest, WorkflowClient};
pub use controller::{HitlController, HitlPhase};
pub use error::HitlError;
pub use request::{ConfirmAction, ConfirmRequest, UserResponse};
pub use resume::detect_unanswered_ask;
