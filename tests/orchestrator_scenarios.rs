//! Integration tests for BuildOrchestrator
//!
//! These tests drive the full CheckImage -> BuildImage -> RunBuild flow through a
//! recording runner, verifying which container runtime calls are made and how
//! failures are reported.

use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use wasm_builder::{
    BuildError, BuildOrchestrator, CommandInvocation, CommandResult, CommandRunner, FailurePolicy,
    OrchestratorConfig, OutputMode, StepOutcome,
};

/// Which runtime operation an invocation corresponds to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Inspect,
    BuildImage,
    RunBuild,
}

fn classify(inv: &CommandInvocation) -> Call {
    match inv.args.first().map(String::as_str) {
        Some("image") => Call::Inspect,
        Some("build") => Call::BuildImage,
        Some("run") => Call::RunBuild,
        other => panic!("unexpected invocation {:?}", other),
    }
}

/// Scripted outcome for one kind of call
#[derive(Clone, Copy)]
enum Scripted {
    Exit(i32),
    SpawnFails,
}

struct RecordingRunner {
    inspect: Scripted,
    build_image: Scripted,
    run_build: Scripted,
    calls: Mutex<Vec<(Call, CommandInvocation, OutputMode)>>,
}

impl RecordingRunner {
    fn new(inspect: Scripted, build_image: Scripted, run_build: Scripted) -> Arc<Self> {
        Arc::new(RecordingRunner {
            inspect,
            build_image,
            run_build,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(c, _, _)| *c).collect()
    }

    fn invocation(&self, call: Call) -> Option<(CommandInvocation, OutputMode)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(c, _, _)| *c == call)
            .map(|(_, inv, mode)| (inv.clone(), *mode))
    }
}

impl CommandRunner for RecordingRunner {
    fn run<'a>(
        &'a self,
        invocation: &'a CommandInvocation,
        mode: OutputMode,
    ) -> BoxFuture<'a, Result<CommandResult, BuildError>> {
        Box::pin(async move {
            let call = classify(invocation);
            self.calls
                .lock()
                .unwrap()
                .push((call, invocation.clone(), mode));

            let scripted = match call {
                Call::Inspect => self.inspect,
                Call::BuildImage => self.build_image,
                Call::RunBuild => self.run_build,
            };
            match scripted {
                Scripted::Exit(code) => Ok(CommandResult::from_code(code)),
                Scripted::SpawnFails => Err(BuildError::SpawnFailed {
                    cmd: invocation.program.clone(),
                    reason: "No such file or directory".to_string(),
                }),
            }
        })
    }
}

fn orchestrator(runner: Arc<RecordingRunner>, policy: FailurePolicy) -> BuildOrchestrator {
    let config = OrchestratorConfig {
        failure_policy: policy,
        jobs: Some(4),
        ..Default::default()
    };
    BuildOrchestrator::new(config, runner)
}

const CWD: &str = "/home/dev/demo/wasm";

#[tokio::test]
async fn test_scenario_a_image_present_skips_image_build() {
    let runner = RecordingRunner::new(Scripted::Exit(0), Scripted::Exit(0), Scripted::Exit(0));
    let report = orchestrator(runner.clone(), FailurePolicy::BestEffort)
        .run(Path::new(CWD))
        .await;

    assert_eq!(runner.calls(), vec![Call::Inspect, Call::RunBuild]);
    assert_eq!(report.image_build, StepOutcome::Skipped);
    assert!(report.succeeded());
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_scenario_b_missing_image_is_built_then_build_runs() {
    let runner = RecordingRunner::new(Scripted::Exit(1), Scripted::Exit(0), Scripted::Exit(0));
    let report = orchestrator(runner.clone(), FailurePolicy::BestEffort)
        .run(Path::new(CWD))
        .await;

    assert_eq!(
        runner.calls(),
        vec![Call::Inspect, Call::BuildImage, Call::RunBuild]
    );
    assert!(matches!(report.image_check, StepOutcome::Failed(_)));
    assert_eq!(report.image_build, StepOutcome::Succeeded);
    assert!(report.succeeded());
}

#[tokio::test]
async fn test_scenario_c_failed_image_build_still_runs_build() {
    let runner = RecordingRunner::new(Scripted::Exit(1), Scripted::Exit(1), Scripted::Exit(0));
    let report = orchestrator(runner.clone(), FailurePolicy::BestEffort)
        .run(Path::new(CWD))
        .await;

    assert_eq!(
        runner.calls(),
        vec![Call::Inspect, Call::BuildImage, Call::RunBuild]
    );
    assert!(matches!(report.image_build, StepOutcome::Failed(_)));
    assert_eq!(report.build, StepOutcome::Succeeded);
}

#[tokio::test]
async fn test_scenario_d_failed_build_is_reported_not_raised() {
    let runner = RecordingRunner::new(Scripted::Exit(0), Scripted::Exit(0), Scripted::Exit(2));
    let report = orchestrator(runner.clone(), FailurePolicy::BestEffort)
        .run(Path::new(CWD))
        .await;

    assert_eq!(runner.calls(), vec![Call::Inspect, Call::RunBuild]);
    match &report.build {
        StepOutcome::Failed(reason) => assert!(reason.contains("exited with code 2")),
        other => panic!("expected failed build, got {:?}", other),
    }
    assert!(!report.succeeded());
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_missing_runtime_counts_as_missing_image() {
    let runner = RecordingRunner::new(
        Scripted::SpawnFails,
        Scripted::SpawnFails,
        Scripted::SpawnFails,
    );
    let report = orchestrator(runner.clone(), FailurePolicy::BestEffort)
        .run(Path::new(CWD))
        .await;

    assert_eq!(
        runner.calls(),
        vec![Call::Inspect, Call::BuildImage, Call::RunBuild]
    );
    assert!(!report.succeeded());
}

#[tokio::test]
async fn test_strict_policy_stops_after_failed_image_build() {
    let runner = RecordingRunner::new(Scripted::Exit(1), Scripted::Exit(1), Scripted::Exit(0));
    let report = orchestrator(runner.clone(), FailurePolicy::Strict)
        .run(Path::new(CWD))
        .await;

    assert_eq!(runner.calls(), vec![Call::Inspect, Call::BuildImage]);
    assert_eq!(report.build, StepOutcome::Skipped);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_build_invoked_exactly_once_for_every_prior_outcome() {
    for inspect in [0, 1] {
        for build_image in [0, 1] {
            let runner = RecordingRunner::new(
                Scripted::Exit(inspect),
                Scripted::Exit(build_image),
                Scripted::Exit(0),
            );
            orchestrator(runner.clone(), FailurePolicy::BestEffort)
                .run(Path::new(CWD))
                .await;

            let calls = runner.calls();
            let runs = calls.iter().filter(|c| **c == Call::RunBuild).count();
            let image_builds = calls.iter().filter(|c| **c == Call::BuildImage).count();
            assert_eq!(runs, 1);
            assert_eq!(image_builds, if inspect == 0 { 0 } else { 1 });
        }
    }
}

#[tokio::test]
async fn test_mount_path_is_parent_of_cwd() {
    let cases = [
        ("/home/dev/demo/wasm", "/home/dev/demo"),
        ("/srv/projects/with space/wasm", "/srv/projects/with space"),
        ("/wasm", "/"),
        ("/mnt/c:/Users/dev/demo/wasm", "/mnt/c:/Users/dev/demo"),
    ];

    for (cwd, expected) in cases {
        let runner = RecordingRunner::new(Scripted::Exit(0), Scripted::Exit(0), Scripted::Exit(0));
        let report = orchestrator(runner.clone(), FailurePolicy::BestEffort)
            .run(Path::new(cwd))
            .await;

        assert_eq!(report.mount_path, Some(PathBuf::from(expected)));
        let (inv, _) = runner.invocation(Call::RunBuild).expect("build was invoked");
        let mount_index = inv.args.iter().position(|a| a == "--mount").unwrap() + 1;
        assert_eq!(
            inv.args[mount_index],
            format!("type=bind,source={},target=/work", expected)
        );
    }
}

#[tokio::test]
async fn test_output_modes_per_step() {
    let runner = RecordingRunner::new(Scripted::Exit(1), Scripted::Exit(0), Scripted::Exit(0));
    orchestrator(runner.clone(), FailurePolicy::BestEffort)
        .run(Path::new(CWD))
        .await;

    assert_eq!(runner.invocation(Call::Inspect).unwrap().1, OutputMode::Captured);
    assert_eq!(runner.invocation(Call::BuildImage).unwrap().1, OutputMode::Streamed);
    assert_eq!(runner.invocation(Call::RunBuild).unwrap().1, OutputMode::Streamed);
}

#[tokio::test]
async fn test_unmountable_path_skips_runtime_call() {
    let runner = RecordingRunner::new(Scripted::Exit(0), Scripted::Exit(0), Scripted::Exit(0));
    let report = orchestrator(runner.clone(), FailurePolicy::BestEffort)
        .run(Path::new("/srv/a,b/demo/wasm"))
        .await;

    assert_eq!(runner.calls(), vec![Call::Inspect]);
    assert!(matches!(report.build, StepOutcome::Failed(_)));
}
