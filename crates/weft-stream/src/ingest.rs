//! Stream ingestion: turns a framed byte stream into parsed events.
//!
//! The activity timeout is enforced two ways: every read is raced against
//! a deadline anchored at the last received byte, and an independent
//! watchdog compares "now" against that same mark and aborts even if a
//! read never settles. The deadline survives watchdog ticks, so the race
//! fires at exactly `activity_timeout` rather than at watchdog
//! granularity. Both timers live inside the returned stream, so dropping
//! it cancels the reader and leaves nothing pending.

use crate::error::StreamError;
use crate::sse::{SseFrameBuffer, DONE_SENTINEL};
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use std::pin::Pin;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use weft_types::{AgentEvent, StreamConfig};

pub type EventStream = Pin<Box<dyn Stream<Item = Result<AgentEvent, StreamError>> + Send>>;

/// Ingest a long-lived HTTP response body.
pub fn ingest_response(response: reqwest::Response, config: StreamConfig) -> EventStream {
    ingest_bytes(
        response.bytes_stream().map_err(StreamError::from),
        config,
    )
}

/// Ingest an arbitrary chunked byte stream. Malformed frames are logged and
/// skipped; `[DONE]` ends the stream without emitting an event; a non-empty
/// trailing partial frame is parsed best-effort.
pub fn ingest_bytes<S>(stream: S, config: StreamConfig) -> EventStream
where
    S: Stream<Item = Result<Bytes, StreamError>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut chunks = Box::pin(stream);
        let mut frames = SseFrameBuffer::new();
        let mut last_activity = Instant::now();

        let mut watchdog = interval_at(
            Instant::now() + config.watchdog_period,
            config.watchdog_period,
        );
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);

        enum Step {
            Chunk(Bytes),
            Ended,
            TimedOut(u64),
            Failed(StreamError),
            Tick,
        }

        loop {
            let step = tokio::select! {
                read = tokio::time::timeout_at(last_activity + config.activity_timeout, chunks.next()) => {
                    match read {
                        Err(_) => Step::TimedOut(config.activity_timeout.as_millis() as u64),
                        Ok(None) => Step::Ended,
                        Ok(Some(Err(err))) => Step::Failed(err),
                        Ok(Some(Ok(bytes))) => Step::Chunk(bytes),
                    }
                }
                _ = watchdog.tick() => {
                    let idle = last_activity.elapsed();
                    if idle >= config.activity_timeout {
                        tracing::warn!(idle_ms = idle.as_millis() as u64, "stream idle, aborting run");
                        Step::TimedOut(idle.as_millis() as u64)
                    } else {
                        Step::Tick
                    }
                }
            };

            let chunk = match step {
                Step::Chunk(chunk) => chunk,
                Step::Tick => continue,
                Step::Ended => break,
                Step::TimedOut(elapsed_ms) => {
                    yield Err(StreamError::Timeout { elapsed_ms });
                    return;
                }
                Step::Failed(err) => {
                    yield Err(err);
                    return;
                }
            };

            last_activity = Instant::now();
            for payload in frames.push(&chunk) {
                if payload == DONE_SENTINEL {
                    return;
                }
                if let Some(event) = parse_event(&payload) {
                    yield Ok(event);
                }
            }
        }

        if let Some(payload) = frames.finish() {
            if payload != DONE_SENTINEL {
                if let Some(event) = parse_event(&payload) {
                    yield Ok(event);
                }
            }
        }
    })
}

fn parse_event(payload: &str) -> Option<AgentEvent> {
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            let excerpt: String = payload.chars().take(200).collect();
            tracing::warn!(error = %err, frame = %excerpt, "skipping malformed frame");
            None
        }
    }
}
