use anyhow::Context;
use std::sync::Arc;

use wasm_builder::config;
use wasm_builder::log_collector::{get_global_logs_path, level_from_str, LOG_LEVEL_ENV_VAR};
use wasm_builder::system::{dry_run_requested, CommandRunner, DryRunRunner, SystemRunner};
use wasm_builder::{BuildOrchestrator, LogCollector};

/// Exit code when configuration cannot be loaded
const EXIT_CONFIG: i32 = 2;

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            if log::max_level() == log::LevelFilter::Off {
                eprintln!("error: {:#}", e);
            } else {
                log::error!("{:#}", e);
            }
            EXIT_CONFIG
        }
    };
    log::logger().flush();
    std::process::exit(code);
}

async fn run() -> anyhow::Result<i32> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;

    // =========================================================================
    // LOGGING INITIALIZATION - MUST BE FIRST
    // =========================================================================
    let console_level = level_from_str(std::env::var(LOG_LEVEL_ENV_VAR).ok().as_deref());
    let collector = match LogCollector::new(&get_global_logs_path(), console_level) {
        Ok(collector) => collector,
        Err(e) => {
            eprintln!("WARNING: {}; logging to console only", e);
            LogCollector::console_only(console_level)
        }
    };
    if let Err(e) = collector.install() {
        eprintln!("WARNING: {}", e);
    }
    if let Some(path) = collector.session_path() {
        log::debug!("Logging to {}", path.display());
    }

    let config = config::load_effective_config(&cwd).context("Invalid configuration")?;

    let runner: Arc<dyn CommandRunner> = if dry_run_requested() {
        log::info!("Dry run: commands will be printed, not executed");
        Arc::new(DryRunRunner)
    } else {
        Arc::new(SystemRunner::new())
    };

    let report = BuildOrchestrator::new(config, runner).run(&cwd).await;
    Ok(report.exit_code())
}
