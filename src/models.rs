//! Core data types for WASM Builder.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// CMake build type passed to the configure step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
pub enum BuildType {
    #[default]
    Debug,
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildType {
    /// Value for `-DCMAKE_BUILD_TYPE=`
    pub fn as_cmake_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
            BuildType::RelWithDebInfo => "RelWithDebInfo",
            BuildType::MinSizeRel => "MinSizeRel",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cmake_str())
    }
}

impl FromStr for BuildType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            "relwithdebinfo" => Ok(BuildType::RelWithDebInfo),
            "minsizerel" => Ok(BuildType::MinSizeRel),
            other => Err(format!(
                "unknown build type '{}', expected one of: Debug, Release, RelWithDebInfo, MinSizeRel",
                other
            )),
        }
    }
}

impl<'de> Deserialize<'de> for BuildType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// What happens after a failed image build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Every step runs regardless of earlier failures
    #[default]
    BestEffort,
    /// A failed image build stops the run before the build step
    Strict,
}

/// How a command's output is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collected into the result, never printed to the console
    Captured,
    /// Forwarded line by line to the console and the log
    Streamed,
}

/// A program plus its argument list. Never joined into a shell string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        CommandInvocation {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Human-readable command line for logging. Arguments containing
    /// whitespace are quoted.
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                out.push('"');
                out.push_str(&arg.replace('"', "\\\""));
                out.push('"');
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Transient record of one external process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn from_code(code: i32) -> Self {
        CommandResult {
            exit_code: Some(code),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Short description of a failed exit, for logs and reports.
    pub fn failure_reason(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Outcome of one orchestration step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed(String),
    Skipped,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded)
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Succeeded => f.write_str("ok"),
            StepOutcome::Failed(reason) => write!(f, "failed ({})", reason),
            StepOutcome::Skipped => f.write_str("skipped"),
        }
    }
}

/// Summary of a complete orchestration run.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// `Succeeded` means the image was already present
    pub image_check: StepOutcome,
    pub image_build: StepOutcome,
    pub build: StepOutcome,
    pub mount_path: Option<PathBuf>,
    pub elapsed: Duration,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        self.build.is_success()
    }

    /// Process exit code for the command-line front end.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_type_parse_case_insensitive() {
        assert_eq!("debug".parse::<BuildType>(), Ok(BuildType::Debug));
        assert_eq!("RELEASE".parse::<BuildType>(), Ok(BuildType::Release));
        assert_eq!(
            "RelWithDebInfo".parse::<BuildType>(),
            Ok(BuildType::RelWithDebInfo)
        );
        assert!("fast".parse::<BuildType>().is_err());
    }

    #[test]
    fn test_build_type_deserialize_from_string() {
        let parsed: BuildType = serde_json::from_str("\"minsizerel\"").unwrap();
        assert_eq!(parsed, BuildType::MinSizeRel);
        assert!(serde_json::from_str::<BuildType>("\"turbo\"").is_err());
    }

    #[test]
    fn test_failure_policy_serde_names() {
        assert_eq!(
            serde_json::to_string(&FailurePolicy::BestEffort).unwrap(),
            "\"best_effort\""
        );
        let strict: FailurePolicy = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(strict, FailurePolicy::Strict);
    }

    #[test]
    fn test_invocation_display_quotes_whitespace() {
        let inv = CommandInvocation::new("docker")
            .arg("run")
            .arg("-v")
            .arg("/home/me/my project:/work")
            .arg("sh")
            .arg("-c")
            .arg("emmake make");
        assert_eq!(
            inv.display(),
            "docker run -v \"/home/me/my project:/work\" sh -c \"emmake make\""
        );
    }

    #[test]
    fn test_command_result_success() {
        assert!(CommandResult::from_code(0).success());
        assert!(!CommandResult::from_code(1).success());
        assert!(!CommandResult::default().success());
        assert_eq!(CommandResult::default().failure_reason(), "terminated by signal");
        assert_eq!(CommandResult::from_code(2).failure_reason(), "exited with code 2");
    }

    #[test]
    fn test_report_exit_code() {
        let mut report = BuildReport {
            image_check: StepOutcome::Succeeded,
            image_build: StepOutcome::Skipped,
            build: StepOutcome::Succeeded,
            mount_path: Some(PathBuf::from("/project")),
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(report.exit_code(), 0);

        report.build = StepOutcome::Failed("exited with code 2".to_string());
        assert!(!report.succeeded());
        assert_eq!(report.exit_code(), 1);
    }
}
