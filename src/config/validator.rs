//! Config validation.

use super::OrchestratorConfig;
use crate::error::ConfigError;

/// Validate a value that becomes a single argv element.
fn validate_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationFailed(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}

/// Validate container image reference.
///
/// Accepts `name`, `name:tag`, `registry/name:tag` and digests. Whitespace
/// and a leading `-` are rejected so the value can never be read as a flag.
pub fn validate_image_name(image: &str) -> Result<(), ConfigError> {
    validate_non_empty("image_name", image)?;

    if image.starts_with('-') {
        return Err(ConfigError::ValidationFailed(format!(
            "image_name must not start with '-': {}",
            image
        )));
    }

    if image.chars().any(char::is_whitespace) {
        return Err(ConfigError::ValidationFailed(format!(
            "image_name must not contain whitespace: {}",
            image
        )));
    }

    Ok(())
}

/// Validate mount target inside the container (absolute, no `:` or `,`).
pub fn validate_mount_target(target: &str) -> Result<(), ConfigError> {
    validate_non_empty("mount_target", target)?;

    if !target.starts_with('/') {
        return Err(ConfigError::ValidationFailed(format!(
            "mount_target must be an absolute container path, got: {}",
            target
        )));
    }

    if target.contains(':') || target.contains(',') {
        return Err(ConfigError::ValidationFailed(format!(
            "mount_target must not contain ':' or ',', got: {}",
            target
        )));
    }

    Ok(())
}

/// Validate build subdirectory (relative, no parent traversal).
pub fn validate_build_subdirectory(subdir: &str) -> Result<(), ConfigError> {
    if subdir.split('/').any(|part| part == "..") {
        return Err(ConfigError::ValidationFailed(format!(
            "build_subdirectory must stay inside the mount, got: {}",
            subdir
        )));
    }
    Ok(())
}

/// Validate a complete configuration.
pub fn validate_config(config: &OrchestratorConfig) -> Result<(), ConfigError> {
    validate_non_empty("runtime_executable", &config.runtime_executable)?;
    validate_image_name(&config.image_name)?;

    if config.dockerfile_context.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "dockerfile_context cannot be empty".to_string(),
        ));
    }

    validate_mount_target(&config.mount_target)?;
    validate_build_subdirectory(&config.build_subdirectory)?;

    if config.jobs == Some(0) {
        return Err(ConfigError::ValidationFailed(
            "jobs must be at least 1".to_string(),
        ));
    }

    Ok(())
}
