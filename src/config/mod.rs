//! Configuration module for containerized WASM builds.
//!
//! # Module Structure
//!
//! - `loader`: Handles loading configurations from JSON/TOML files
//! - `validator`: Validates configuration fields before any command runs
//!
//! # Configuration Flow
//!
//! 1. `resolve_config_path` picks a file from the environment or well-known locations
//! 2. `loader` parses it, or built-in defaults are used
//! 3. Validator ensures all fields are usable
//! 4. The final config is handed to the orchestrator

pub mod loader;
pub mod validator;

use crate::error::ConfigError;
use crate::models::{BuildType, FailurePolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "WASM_BUILDER_CONFIG";

/// Config file looked up in the current directory
pub const LOCAL_CONFIG_FILE: &str = "wasm_builder.toml";

/// Everything the orchestrator needs to know about the container and toolchain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Container runtime CLI (`docker`, `podman`, ...)
    pub runtime_executable: String,

    /// Image checked for, built if missing, and run
    pub image_name: String,

    /// Build context directory holding the Dockerfile
    pub dockerfile_context: PathBuf,

    /// Where the project root is mounted inside the container
    pub mount_target: String,

    /// Directory under `mount_target` in which the toolchain runs
    pub build_subdirectory: String,

    /// CMake build type
    pub build_type: BuildType,

    /// Parallel make jobs; `None` uses the host CPU count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    pub failure_policy: FailurePolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            runtime_executable: "docker".to_string(),
            image_name: "emsdk-minimal-wgpu".to_string(),
            dockerfile_context: PathBuf::from("."),
            mount_target: "/work".to_string(),
            build_subdirectory: "wasm".to_string(),
            build_type: BuildType::Debug,
            jobs: None,
            failure_policy: FailurePolicy::BestEffort,
        }
    }
}

impl OrchestratorConfig {
    /// Job count passed to `make -j`.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Working directory inside the container.
    pub fn container_workdir(&self) -> String {
        let target = self.mount_target.trim_end_matches('/');
        let subdir = self.build_subdirectory.trim_matches('/');
        if subdir.is_empty() {
            target.to_string()
        } else {
            format!("{}/{}", target, subdir)
        }
    }
}

/// Choose the config file for this run.
///
/// Order: explicit path from the environment, `wasm_builder.toml` in `cwd`,
/// then the per-user `config.json`. Returns `None` when defaults apply.
pub fn resolve_config_path(explicit: Option<PathBuf>, cwd: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }

    let local = cwd.join(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    match loader::get_global_config_path() {
        Ok(global) if global.is_file() => Some(global),
        _ => None,
    }
}

/// Load and validate the configuration for a run started in `cwd`.
pub fn load_effective_config(cwd: &Path) -> Result<OrchestratorConfig, ConfigError> {
    let explicit = std::env::var_os(CONFIG_ENV_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);

    let config = match resolve_config_path(explicit, cwd) {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            loader::load_config_from_file(&path)?
        }
        None => {
            log::info!("No configuration file found, using built-in defaults");
            OrchestratorConfig::default()
        }
    };

    validator::validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_matches_emsdk_layout() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.runtime_executable, "docker");
        assert_eq!(config.image_name, "emsdk-minimal-wgpu");
        assert_eq!(config.dockerfile_context, PathBuf::from("."));
        assert_eq!(config.mount_target, "/work");
        assert_eq!(config.build_subdirectory, "wasm");
        assert_eq!(config.build_type, BuildType::Debug);
        assert_eq!(config.failure_policy, FailurePolicy::BestEffort);
    }

    #[test]
    fn test_container_workdir_joins_cleanly() {
        let mut config = OrchestratorConfig::default();
        assert_eq!(config.container_workdir(), "/work/wasm");

        config.mount_target = "/work/".to_string();
        config.build_subdirectory = "/build/wasm/".to_string();
        assert_eq!(config.container_workdir(), "/work/build/wasm");

        config.build_subdirectory = String::new();
        assert_eq!(config.container_workdir(), "/work");
    }

    #[test]
    fn test_effective_jobs() {
        let mut config = OrchestratorConfig::default();
        assert!(config.effective_jobs() >= 1);

        config.jobs = Some(6);
        assert_eq!(config.effective_jobs(), 6);

        config.jobs = Some(0);
        assert_eq!(config.effective_jobs(), 1);
    }

    #[test]
    fn test_resolve_prefers_explicit_path() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(LOCAL_CONFIG_FILE), "").unwrap();

        let explicit = PathBuf::from("/somewhere/else.json");
        let resolved = resolve_config_path(Some(explicit.clone()), temp_dir.path());
        assert_eq!(resolved, Some(explicit));
    }

    #[test]
    fn test_resolve_finds_local_file() {
        let temp_dir = TempDir::new().unwrap();
        let local = temp_dir.path().join(LOCAL_CONFIG_FILE);
        std::fs::write(&local, "image_name = \"custom\"\n").unwrap();

        assert_eq!(resolve_config_path(None, temp_dir.path()), Some(local));
    }
}
