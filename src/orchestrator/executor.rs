//! Output streaming for spawned tools and progress parsing of cmake/make output.

use crate::error::BuildError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::ExitStatus;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Child;

static STEP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*(\d+)/(\d+)\]").expect("valid step regex"));

static PERCENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\s*(\d+)%\]").expect("valid percent regex"));

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Parses progress out of toolchain output.
///
/// Priority:
/// 1. cmake milestones (`-- Configuring done`, `-- Build files have been written`)
/// 2. `[X/Y]` step counters
/// 3. `[ N%]` make percentages
pub fn parse_build_progress(line: &str) -> Option<u32> {
    if line.contains("-- Configuring done") {
        return Some(0);
    }
    if line.contains("-- Build files have been written") {
        return Some(1);
    }

    if let Some(caps) = STEP_PATTERN.captures(line) {
        if let (Ok(current), Ok(total)) = (caps[1].parse::<u64>(), caps[2].parse::<u64>()) {
            if total > 0 {
                return Some(((current * 100 / total) as u32).min(100));
            }
        }
    }

    if let Some(caps) = PERCENT_PATTERN.captures(line) {
        if let Ok(progress) = caps[1].parse::<u32>() {
            return Some(progress.min(100));
        }
    }

    None
}

/// True for lines worth surfacing as a milestone.
pub fn is_milestone(line: &str) -> bool {
    line.starts_with("-- Configuring done")
        || line.starts_with("-- Generating done")
        || line.starts_with("-- Build files have been written")
        || line.contains("Built target ")
}

/// Read one raw line, or report EOF once the reader has been dropped.
async fn next_raw_line<R>(reader: &mut Option<R>, buf: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    match reader {
        Some(r) => r.read_until(b'\n', buf).await,
        None => Ok(0),
    }
}

/// Take a completed line out of `buf`, decoding invalid UTF-8 lossily.
fn take_line(buf: &mut Vec<u8>) -> String {
    let line = String::from_utf8_lossy(buf)
        .trim_end_matches(&['\n', '\r'][..])
        .to_string();
    buf.clear();
    line
}

/// Drain stdout and stderr of a piped child, handing every line to `on_line`,
/// then wait for it to exit.
///
/// A pipe is only considered closed at EOF. On a read error its reader is
/// dropped so the child sees a closed pipe instead of blocking on a full one.
pub async fn stream_child<F>(child: &mut Child, mut on_line: F) -> Result<ExitStatus, BuildError>
where
    F: FnMut(StreamKind, String),
{
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| BuildError::OutputCapture("stdout was not piped".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| BuildError::OutputCapture("stderr was not piped".to_string()))?;

    let mut stdout_reader = Some(BufReader::new(stdout));
    let mut stderr_reader = Some(BufReader::new(stderr));
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();

    while stdout_reader.is_some() || stderr_reader.is_some() {
        tokio::select! {
            read = next_raw_line(&mut stdout_reader, &mut stdout_buf), if stdout_reader.is_some() => match read {
                Ok(0) => stdout_reader = None,
                Ok(_) => on_line(StreamKind::Stdout, take_line(&mut stdout_buf)),
                Err(e) => {
                    log::warn!("stdout read error: {}", e);
                    stdout_reader = None;
                }
            },
            read = next_raw_line(&mut stderr_reader, &mut stderr_buf), if stderr_reader.is_some() => match read {
                Ok(0) => stderr_reader = None,
                Ok(_) => on_line(StreamKind::Stderr, take_line(&mut stderr_buf)),
                Err(e) => {
                    log::warn!("stderr read error: {}", e);
                    stderr_reader = None;
                }
            },
        }
    }

    child
        .wait()
        .await
        .map_err(|e| BuildError::OutputCapture(format!("Failed to wait for process: {}", e)))
}
