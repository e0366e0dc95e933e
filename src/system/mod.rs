//! System module: container runtime command execution.
//!
//! `CommandRunner` is the seam between orchestration and real processes.
//! Production uses `SystemRunner`; dry runs use `DryRunRunner`; tests
//! substitute a recording mock.

use crate::error::BuildError;
use crate::log_collector::{PARSED_TARGET, TOOL_TARGET};
use crate::models::{CommandInvocation, CommandResult, OutputMode};
use crate::orchestrator::executor::{is_milestone, parse_build_progress, stream_child, StreamKind};
use futures::future::BoxFuture;
use std::process::Stdio;
use tokio::process::Command;

/// Environment variable that turns on dry-run mode
pub const DRY_RUN_ENV_VAR: &str = "WASM_BUILDER_DRY_RUN";

const PROGRESS_STEP: u32 = 25;

/// Executes one external command to completion.
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` and wait for it to exit.
    ///
    /// `Err` only when the process could not be started or observed; a
    /// non-zero exit is a successful call with a failing `CommandResult`.
    fn run<'a>(
        &'a self,
        invocation: &'a CommandInvocation,
        mode: OutputMode,
    ) -> BoxFuture<'a, Result<CommandResult, BuildError>>;
}

/// Default production implementation backed by `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        SystemRunner
    }

    fn command(invocation: &CommandInvocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        cmd.stdin(Stdio::null());
        cmd.kill_on_drop(true);
        cmd
    }

    fn spawn_error(invocation: &CommandInvocation, e: std::io::Error) -> BuildError {
        BuildError::SpawnFailed {
            cmd: invocation.program.clone(),
            reason: e.to_string(),
        }
    }

    async fn run_captured(invocation: &CommandInvocation) -> Result<CommandResult, BuildError> {
        let output = Self::command(invocation)
            .output()
            .await
            .map_err(|e| Self::spawn_error(invocation, e))?;

        Ok(CommandResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn run_streamed(invocation: &CommandInvocation) -> Result<CommandResult, BuildError> {
        let mut child = Self::command(invocation)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(invocation, e))?;

        let mut last_reported = 0u32;
        let status = stream_child(&mut child, |kind, line| {
            match kind {
                StreamKind::Stdout => println!("{}", line),
                StreamKind::Stderr => eprintln!("{}", line),
            }
            log::info!(target: TOOL_TARGET, "{}", line);

            if line.starts_with("-- ") && is_milestone(&line) {
                log::info!(target: PARSED_TARGET, "{}", line.trim_start_matches("-- "));
            } else if let Some(progress) = parse_build_progress(&line) {
                if progress >= last_reported + PROGRESS_STEP
                    || (progress == 100 && last_reported < 100)
                {
                    last_reported = progress;
                    log::info!(target: PARSED_TARGET, "Compiling: {}%", progress);
                }
            }
        })
        .await?;

        Ok(CommandResult {
            exit_code: status.code(),
            ..Default::default()
        })
    }
}

impl CommandRunner for SystemRunner {
    fn run<'a>(
        &'a self,
        invocation: &'a CommandInvocation,
        mode: OutputMode,
    ) -> BoxFuture<'a, Result<CommandResult, BuildError>> {
        Box::pin(async move {
            log::debug!("Executing: {}", invocation);
            match mode {
                OutputMode::Captured => Self::run_captured(invocation).await,
                OutputMode::Streamed => Self::run_streamed(invocation).await,
            }
        })
    }
}

/// Logs every command and reports success without executing anything.
#[derive(Debug, Default, Clone)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run<'a>(
        &'a self,
        invocation: &'a CommandInvocation,
        mode: OutputMode,
    ) -> BoxFuture<'a, Result<CommandResult, BuildError>> {
        Box::pin(async move {
            log::info!("[dry-run] {} ({:?})", invocation, mode);
            Ok(CommandResult::from_code(0))
        })
    }
}

/// Whether dry-run mode was requested through the environment.
pub fn dry_run_requested() -> bool {
    std::env::var_os(DRY_RUN_ENV_VAR).map_or(false, |v| !v.is_empty() && v != "0")
}
