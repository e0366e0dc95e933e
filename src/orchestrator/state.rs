//! Build state management and phase tracking.
//!
//! - `BuildPhaseState`: discrete phases of one run
//! - `OrchestrationState`: current phase, step outcomes and timing
//!
//! Transitions only move forward; there is no recovery restart within a run.

use crate::error::BuildError;
use crate::models::{BuildReport, StepOutcome};
use std::path::PathBuf;
use std::time::Instant;

/// Build phase enumeration - discrete states in the build lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildPhaseState {
    /// Inspect the container image
    CheckImage,

    /// Build the image (only entered when the check failed)
    BuildImage,

    /// Derive the host directory to mount
    ComputeMountPath,

    /// Run the toolchain in the container
    RunBuild,

    Completed,

    Failed,
}

impl BuildPhaseState {
    /// Get the human-readable name for this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPhaseState::CheckImage => "check-image",
            BuildPhaseState::BuildImage => "build-image",
            BuildPhaseState::ComputeMountPath => "compute-mount-path",
            BuildPhaseState::RunBuild => "run-build",
            BuildPhaseState::Completed => "completed",
            BuildPhaseState::Failed => "failed",
        }
    }

    /// Get all valid phase transitions FROM this phase.
    pub fn valid_next_phases(&self) -> &'static [BuildPhaseState] {
        use BuildPhaseState::*;
        match self {
            CheckImage => &[BuildImage, ComputeMountPath, Failed],
            BuildImage => &[ComputeMountPath, Failed],
            ComputeMountPath => &[RunBuild, Failed],
            RunBuild => &[Completed, Failed],
            Completed | Failed => &[],
        }
    }

    pub fn can_transition_to(&self, next: BuildPhaseState) -> bool {
        self.valid_next_phases().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildPhaseState::Completed | BuildPhaseState::Failed)
    }
}

impl std::fmt::Display for BuildPhaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution state of a single orchestration run.
#[derive(Debug, Clone)]
pub struct OrchestrationState {
    pub phase: BuildPhaseState,

    pub image_check: StepOutcome,
    pub image_build: StepOutcome,
    pub build: StepOutcome,

    pub mount_path: Option<PathBuf>,

    /// Error message if the run failed
    pub error: Option<String>,

    start_time: Instant,
}

impl OrchestrationState {
    pub fn new() -> Self {
        OrchestrationState {
            phase: BuildPhaseState::CheckImage,
            image_check: StepOutcome::Skipped,
            image_build: StepOutcome::Skipped,
            build: StepOutcome::Skipped,
            mount_path: None,
            error: None,
            start_time: Instant::now(),
        }
    }

    /// Attempt to transition to the next phase.
    pub fn transition_to(&mut self, next_phase: BuildPhaseState) -> Result<(), BuildError> {
        if !self.phase.can_transition_to(next_phase) {
            return Err(BuildError::InvalidTransition {
                from: self.phase.as_str().to_string(),
                to: next_phase.as_str().to_string(),
            });
        }
        log::debug!("Phase {} -> {}", self.phase, next_phase);
        self.phase = next_phase;
        Ok(())
    }

    /// Record an error and mark the run as failed.
    pub fn record_error(&mut self, error: String) {
        self.error = Some(error);
        self.phase = BuildPhaseState::Failed;
    }

    pub fn into_report(self) -> BuildReport {
        BuildReport {
            image_check: self.image_check,
            image_build: self.image_build,
            build: self.build,
            mount_path: self.mount_path,
            elapsed: self.start_time.elapsed(),
        }
    }
}

impl Default for OrchestrationState {
    fn default() -> Self {
        Self::new()
    }
}
