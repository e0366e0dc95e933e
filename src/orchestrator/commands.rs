//! Argument-list construction for every container runtime call.
//!
//! The host path is always one argv element. The `sh -c` payload run inside
//! the container only ever contains enum-rendered and numeric values.

use crate::config::OrchestratorConfig;
use crate::error::AppError;
use crate::models::CommandInvocation;
use std::path::{Path, PathBuf};

/// `<runtime> image inspect <image>`
pub fn inspect_image(config: &OrchestratorConfig) -> CommandInvocation {
    CommandInvocation::new(&config.runtime_executable)
        .arg("image")
        .arg("inspect")
        .arg(&config.image_name)
}

/// `<runtime> build -t <image> <context>`
pub fn build_image(config: &OrchestratorConfig) -> CommandInvocation {
    CommandInvocation::new(&config.runtime_executable)
        .arg("build")
        .arg("-t")
        .arg(&config.image_name)
        .arg(config.dockerfile_context.to_string_lossy())
}

/// Configure + build payload executed by `sh -c` in the container.
pub fn toolchain_script(config: &OrchestratorConfig) -> String {
    format!(
        "emcmake cmake -DCMAKE_BUILD_TYPE={} .. && emmake make -j{}",
        config.build_type.as_cmake_str(),
        config.effective_jobs()
    )
}

/// `type=bind,source=<path>,target=<target>` value for `--mount`
pub fn bind_mount_spec(mount_path: &Path, target: &str) -> String {
    format!(
        "type=bind,source={},target={}",
        mount_path.to_string_lossy(),
        target
    )
}

/// `<runtime> run --rm --mount type=bind,... -w <workdir> <image> sh -c <script>`
pub fn run_build(config: &OrchestratorConfig, mount_path: &Path) -> CommandInvocation {
    CommandInvocation::new(&config.runtime_executable)
        .arg("run")
        .arg("--rm")
        .arg("--mount")
        .arg(bind_mount_spec(mount_path, &config.mount_target))
        .arg("-w")
        .arg(config.container_workdir())
        .arg(&config.image_name)
        .arg("sh")
        .arg("-c")
        .arg(toolchain_script(config))
}

/// Parent of the current directory, or the directory itself at the root.
pub fn compute_mount_path(cwd: &Path) -> PathBuf {
    cwd.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.to_path_buf())
}

/// Check a host path can be expressed as a `--mount` source.
///
/// Colons are fine (Windows drive letters); commas separate `--mount` fields.
pub fn validate_mount_path(path: &Path) -> Result<(), AppError> {
    let path_str = path.to_str().ok_or_else(|| {
        AppError::InvalidPath("Path contains invalid UTF-8 characters".to_string())
    })?;

    if !path.is_absolute() {
        return Err(AppError::InvalidPath(format!(
            "Path must be absolute: {}",
            path_str
        )));
    }

    if path_str.contains(',') {
        return Err(AppError::InvalidPath(format!(
            "Path contains commas: {}",
            path_str
        )));
    }

    Ok(())
}
