//! Build Orchestration: CheckImage -> BuildImage (if missing) -> ComputeMountPath -> RunBuild.

pub mod commands;
pub mod executor;
pub mod state;

use std::path::Path;
use std::sync::Arc;

pub use commands::{compute_mount_path, validate_mount_path};
pub use state::{BuildPhaseState, OrchestrationState};

use crate::config::OrchestratorConfig;
use crate::error::BuildError;
use crate::log_collector::PARSED_TARGET;
use crate::models::{
    BuildReport, CommandInvocation, CommandResult, FailurePolicy, OutputMode, StepOutcome,
};
use crate::system::CommandRunner;

/// Sequences the container runtime calls of one WASM build.
///
/// Failures of external commands never abort `run`; they are logged and
/// recorded in the returned [`BuildReport`].
#[derive(Clone)]
pub struct BuildOrchestrator {
    config: OrchestratorConfig,
    runner: Arc<dyn CommandRunner>,
}

impl BuildOrchestrator {
    pub fn new(config: OrchestratorConfig, runner: Arc<dyn CommandRunner>) -> Self {
        BuildOrchestrator { config, runner }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run every phase for a build started from `cwd`.
    pub async fn run(&self, cwd: &Path) -> BuildReport {
        let mut state = OrchestrationState::new();

        if let Err(e) = self.drive(cwd, &mut state).await {
            log::error!("Build orchestration stopped: {}", e);
            state.record_error(e.to_string());
        }

        let report = state.into_report();
        log_summary(&report);
        report
    }

    async fn drive(&self, cwd: &Path, state: &mut OrchestrationState) -> Result<(), BuildError> {
        // Phase 1: image presence check
        log::info!(target: PARSED_TARGET, "Checking container image {}...", self.config.image_name);
        let inspect = commands::inspect_image(&self.config);
        state.image_check = self.execute(&inspect, OutputMode::Captured).await;

        if state.image_check.is_success() {
            log::info!("Image {} is present", self.config.image_name);
        } else {
            // Phase 2: conditional image build
            state.transition_to(BuildPhaseState::BuildImage)?;
            log::info!(target: PARSED_TARGET, "Creating container image {}...", self.config.image_name);

            let build_image = commands::build_image(&self.config);
            state.image_build = self.execute(&build_image, OutputMode::Streamed).await;

            if let StepOutcome::Failed(reason) = &state.image_build {
                match self.config.failure_policy {
                    FailurePolicy::Strict => {
                        return Err(BuildError::ImageBuildFailed(reason.clone()));
                    }
                    FailurePolicy::BestEffort => {
                        log::warn!("Image build failed ({}), continuing with the build step", reason);
                    }
                }
            }
        }

        // Phase 3: mount path
        state.transition_to(BuildPhaseState::ComputeMountPath)?;
        let mount_path = compute_mount_path(cwd);
        log::info!("Mounting {} at {}", mount_path.display(), self.config.mount_target);
        state.mount_path = Some(mount_path.clone());

        if let Err(e) = validate_mount_path(&mount_path) {
            state.build = StepOutcome::Failed(e.user_message());
            return Err(BuildError::BuildFailed(e.user_message()));
        }

        // Phase 4: toolchain run
        state.transition_to(BuildPhaseState::RunBuild)?;
        log::info!(
            target: PARSED_TARGET,
            "Building {} in {}...",
            self.config.build_type,
            self.config.container_workdir()
        );
        let run_build = commands::run_build(&self.config, &mount_path);
        state.build = self.execute(&run_build, OutputMode::Streamed).await;

        if let StepOutcome::Failed(reason) = &state.build {
            return Err(BuildError::BuildFailed(reason.clone()));
        }
        state.transition_to(BuildPhaseState::Completed)
    }

    /// Run one command and collapse the result into a step outcome.
    async fn execute(&self, invocation: &CommandInvocation, mode: OutputMode) -> StepOutcome {
        match self.runner.run(invocation, mode).await {
            Ok(result) => {
                log_captured(invocation, &result);
                if result.success() {
                    StepOutcome::Succeeded
                } else {
                    let reason = format!("'{}' {}", invocation.display(), result.failure_reason());
                    log::debug!("{}", reason);
                    StepOutcome::Failed(reason)
                }
            }
            Err(e) => {
                log::warn!("{}", e);
                StepOutcome::Failed(e.to_string())
            }
        }
    }
}

fn log_captured(invocation: &CommandInvocation, result: &CommandResult) {
    for (name, text) in [("stdout", &result.stdout), ("stderr", &result.stderr)] {
        let text = text.trim();
        if !text.is_empty() {
            log::debug!("[{} {}] {}", invocation.program, name, text);
        }
    }
}

fn log_summary(report: &BuildReport) {
    let secs = report.elapsed.as_secs_f32();
    if report.succeeded() {
        log::info!(target: PARSED_TARGET, "Build completed successfully in {:.1}s", secs);
    } else {
        log::error!(
            "Build failed after {:.1}s (image check: {}, image build: {}, build: {})",
            secs,
            report.image_check,
            report.image_build,
            report.build
        );
    }
}
