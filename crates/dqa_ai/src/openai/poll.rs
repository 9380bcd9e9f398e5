//! Status polling for file batches and runs.

use std::time::{Duration, Instant};

use dqa_core::domain::{FileBatch, IngestionStatus, Run};
use dqa_core::error::AppError;
use tracing::debug;

use super::sse::timeout_error;

/// Re-fetch `batch` every `interval` until it leaves `in_progress`.
pub(crate) fn poll_file_batch<F>(
    mut batch: FileBatch,
    interval: Duration,
    mut fetch: F,
) -> Result<FileBatch, AppError>
where
    F: FnMut(&FileBatch) -> Result<FileBatch, AppError>,
{
    while batch.status == IngestionStatus::InProgress {
        debug!(
            batch_id = %batch.id,
            completed = batch.file_counts.completed,
            total = batch.file_counts.total,
            "waiting for file batch"
        );
        std::thread::sleep(interval);
        batch = fetch(&batch)?;
    }
    Ok(batch)
}

/// Re-fetch `run` every `interval` until it reaches a terminal status or `deadline` passes.
pub(crate) fn poll_run<F>(
    mut run: Run,
    interval: Duration,
    deadline: Option<Instant>,
    mut fetch: F,
) -> Result<Run, AppError>
where
    F: FnMut(&Run) -> Result<Run, AppError>,
{
    while !run.status.is_terminal() {
        if let Some(d) = deadline {
            if Instant::now() >= d {
                return Err(timeout_error(Some(&run)));
            }
        }
        debug!(run_id = %run.id, status = run.status.as_str(), "waiting for run");
        std::thread::sleep(interval);
        run = fetch(&run)?;
    }
    Ok(run)
}
