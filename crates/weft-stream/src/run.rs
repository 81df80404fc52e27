//! Whole-run drivers: fold an event stream into a `RunState`, with an
//! optional retry wrapper for transient connection failures.

use crate::error::StreamError;
use crate::ingest::EventStream;
use crate::reducer::RunState;
use futures::StreamExt;
use std::future::Future;
use weft_types::{AgentEvent, StreamConfig};

/// How a run ended. `Paused` means the workflow suspended itself waiting for
/// user input; it is a success, never a retry candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Paused,
}

/// Drive one stream to its end, applying every event in arrival order.
/// Stream errors close the run and are returned after the state has been
/// marked failed.
pub async fn run_stream(
    mut events: EventStream,
    state: &mut RunState,
) -> Result<RunOutcome, StreamError> {
    state.begin_run();
    let mut paused = false;
    while let Some(next) = events.next().await {
        match next {
            Ok(event) => {
                if matches!(event, AgentEvent::WorkflowPaused { .. }) {
                    paused = true;
                }
                state.apply(event);
            }
            Err(err) => {
                state.mark_failed(&err);
                return Err(err);
            }
        }
    }
    state.is_streaming = false;

    if paused && !state.completed {
        Ok(RunOutcome::Paused)
    } else {
        Ok(RunOutcome::Completed)
    }
}

/// Run with retries: `connect` produces a fresh stream per attempt. Retries
/// happen only between independent attempts, with delay
/// `retry_base_delay * attempt_number`. A run that ends `Paused` resolved
/// normally and is returned as-is.
pub async fn run_with_retry<F, Fut>(
    config: &StreamConfig,
    state: &mut RunState,
    mut connect: F,
) -> Result<RunOutcome, StreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<EventStream, StreamError>>,
{
    let mut last: Option<StreamError> = None;
    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = config.retry_base_delay * attempt;
            tracing::info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying run after failure"
            );
            tokio::time::sleep(delay).await;
        }
        let stream = match connect().await {
            Ok(stream) => stream,
            Err(err) => {
                last = Some(err);
                continue;
            }
        };
        match run_stream(stream, state).await {
            Ok(outcome) => return Ok(outcome),
            Err(err) => last = Some(err),
        }
    }

    Err(StreamError::RetriesExhausted {
        attempts: config.max_retries + 1,
        last: last
            .map(|err| err.to_string())
            .unwrap_or_else(|| "no attempt recorded".to_string()),
    })
}
