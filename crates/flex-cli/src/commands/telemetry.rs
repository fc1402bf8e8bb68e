use flex_cli::manifest::record_manifest;
use std::{path::Path, time::Instant};
use tracing::{debug, warn};

/// Record a run manifest next to the command's outputs. Failure to record
/// is logged and never fails the command.
pub fn record_run_timed(
    out: &Path,
    command: &str,
    params: &[(&str, &str)],
    start: Instant,
    result: &anyhow::Result<()>,
) {
    let duration_ms = start.elapsed().as_millis();
    let status = if result.is_ok() { "success" } else { "failure" };
    match record_manifest(out, command, params, status, Some(duration_ms)) {
        Ok(path) => debug!(manifest = %path.display(), "recorded run manifest"),
        Err(err) => warn!("failed to record run manifest: {err:#}"),
    }
}
