//! WASM Builder
//!
//! Produces a WebAssembly build of a C++ project by running the emscripten
//! cmake/make toolchain inside a container image, building that image first
//! when it is missing.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures and types
//! - **config**: Orchestrator configuration, loading and validation
//! - **system**: Command execution against the container runtime
//! - **orchestrator**: Phase sequencing and state tracking
//! - **log_collector**: Console + on-disk logging backend

// Core foundational modules
pub mod error;
pub mod models;

pub mod config;

pub mod system;

pub mod log_collector;

pub mod orchestrator;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{AppError, BuildError, ConfigError, Result};

pub use models::{
    BuildReport, BuildType, CommandInvocation, CommandResult, FailurePolicy, OutputMode,
    StepOutcome,
};

pub use config::OrchestratorConfig;

pub use system::{CommandRunner, DryRunRunner, SystemRunner};

pub use orchestrator::{BuildOrchestrator, BuildPhaseState, OrchestrationState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
