//! Reader for the server-sent events emitted by a streamed run.

use std::io::BufRead;
use std::time::Instant;

use dqa_core::domain::Run;
use dqa_core::error::AppError;
use serde::Deserialize;
use tracing::debug;

use super::wire::{ApiErrorBody, RunObject};

#[derive(Debug, Clone, PartialEq, Eq)]
struct SseEvent {
    event: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StreamErrorPayload {
    Wrapped { error: ApiErrorBody },
    Bare(ApiErrorBody),
}

/// Consume events until the run reaches a terminal state or the stream reports `done`.
///
/// Returns the last run object seen. The deadline is only checked between events.
pub(crate) fn read_run_events<R: BufRead>(reader: R, deadline: Option<Instant>) -> Result<Run, AppError> {
    let mut last_run: Option<Run> = None;
    let mut event = String::new();
    let mut data: Vec<String> = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(|e| {
            AppError::new("INFERENCE_STREAM_FAILED", "Run event stream was interrupted")
                .with_details(e.to_string())
                .with_retryable(true)
        })?;

        if line.is_empty() {
            if event.is_empty() && data.is_empty() {
                continue;
            }
            let ev = SseEvent {
                event: std::mem::take(&mut event),
                data: std::mem::take(&mut data).join("\n"),
            };
            if let Some(run) = handle_event(&ev, &mut last_run)? {
                return Ok(run);
            }
            if let Some(d) = deadline {
                if Instant::now() >= d {
                    return Err(timeout_error(last_run.as_ref()));
                }
            }
            continue;
        }

        if let Some(value) = line.strip_prefix("event:") {
            event = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        // Comments (`:`) and `id:`/`retry:` fields carry nothing we need.
    }

    last_run.ok_or_else(|| {
        AppError::new(
            "INFERENCE_STREAM_FAILED",
            "Run event stream ended before any run state was received",
        )
    })
}

/// Returns `Some(run)` once the stream has nothing more to say about the run.
fn handle_event(ev: &SseEvent, last_run: &mut Option<Run>) -> Result<Option<Run>, AppError> {
    debug!(event = %ev.event, "run event");
    match ev.event.as_str() {
        "done" => Ok(last_run.clone()),
        "error" => {
            let message = serde_json::from_str::<StreamErrorPayload>(&ev.data)
                .ok()
                .and_then(|p| match p {
                    StreamErrorPayload::Wrapped { error } => error.message,
                    StreamErrorPayload::Bare(error) => error.message,
                })
                .unwrap_or_else(|| "Run event stream reported an error".to_string());
            Err(AppError::new("INFERENCE_STREAM_FAILED", message).with_details(ev.data.clone()))
        }
        name if name.starts_with("thread.run.") && !name.starts_with("thread.run.step") => {
            let run: Run = serde_json::from_str::<RunObject>(&ev.data)
                .map_err(|e| {
                    AppError::new("INFERENCE_STREAM_FAILED", "Failed to decode run event")
                        .with_details(format!("event={name}; err={e}"))
                })?
                .into();
            let terminal = run.status.is_terminal();
            *last_run = Some(run.clone());
            if terminal {
                Ok(Some(run))
            } else {
                Ok(None)
            }
        }
        _ => Ok(None),
    }
}

pub(crate) fn timeout_error(last_run: Option<&Run>) -> AppError {
    let details = match last_run {
        Some(r) => format!("run_id={}; status={}", r.id, r.status.as_str()),
        None => "no run state received".to_string(),
    };
    AppError::new("INFERENCE_RUN_TIMEOUT", "Run did not finish before the timeout")
        .with_details(details)
        .with_retryable(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dqa_core::domain::RunStatus;
    use std::io::Cursor;

    fn run_json(status: &str) -> String {
        format!(r#"{{"id":"run_1","object":"thread.run","thread_id":"thread_1","status":"{status}"}}"#)
    }

    #[test]
    fn stops_at_completed_run_event() {
        let body = format!(
            "event: thread.run.created\ndata: {}\n\n\
             event: thread.run.step.created\ndata: {{\"id\":\"step_1\"}}\n\n\
             event: thread.message.delta\ndata: {{\"id\":\"msg_1\",\"delta\":{{}}}}\n\n\
             event: thread.run.completed\ndata: {}\n\n\
             event: done\ndata: [DONE]\n\n",
            run_json("queued"),
            run_json("completed")
        );
        let run = read_run_events(Cursor::new(body), None).expect("run");
        assert_eq!(run.id, "run_1");
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[test]
    fn done_returns_last_seen_run() {
        let body = format!(
            "event: thread.run.in_progress\ndata: {}\n\nevent: done\ndata: [DONE]\n\n",
            run_json("in_progress")
        );
        let run = read_run_events(Cursor::new(body), None).expect("run");
        assert_eq!(run.status, RunStatus::InProgress);
    }

    #[test]
    fn failed_run_is_terminal() {
        let body = format!("event: thread.run.failed\ndata: {}\n\n", run_json("failed"));
        let run = read_run_events(Cursor::new(body), None).expect("run");
        assert_eq!(run.status, RunStatus::Failed);
    }

    #[test]
    fn unrecognised_run_status_ends_the_stream() {
        let body = format!(
            "event: thread.run.paused\ndata: {}\n\nevent: thread.run.completed\ndata: {}\n\n",
            run_json("paused"),
            run_json("completed")
        );
        let run = read_run_events(Cursor::new(body), None).expect("run");
        assert_eq!(run.status, RunStatus::Unknown);
    }

    #[test]
    fn error_event_surfaces_vendor_message() {
        let body = "event: error\ndata: {\"error\":{\"message\":\"server overloaded\"}}\n\n";
        let err = read_run_events(Cursor::new(body), None).expect_err("should error");
        assert_eq!(err.code, "INFERENCE_STREAM_FAILED");
        assert_eq!(err.message, "server overloaded");
    }

    #[test]
    fn empty_stream_is_an_error() {
        let err = read_run_events(Cursor::new(": keep-alive\n\n"), None).expect_err("should error");
        assert_eq!(err.code, "INFERENCE_STREAM_FAILED");
    }

    #[test]
    fn expired_deadline_stops_reading() {
        let body = format!(
            "event: thread.run.queued\ndata: {}\n\nevent: thread.run.completed\ndata: {}\n\n",
            run_json("queued"),
            run_json("completed")
        );
        let past = Instant::now() - std::time::Duration::from_millis(1);
        let err = read_run_events(Cursor::new(body), Some(past)).expect_err("should time out");
        assert_eq!(err.code, "INFERENCE_RUN_TIMEOUT");
    }
}
