pub mod config;
pub mod controller;
pub mod errors;
pub mod fetcher;
pub mod hotkeys;
pub mod logging;
pub mod purge;
pub mod runtime;
pub mod sqs;
pub mod tui;
pub mod types;
pub mod view;
pub mod worker_pool;

use clap::{error::ErrorKind, Parser, Subcommand};
use config::{load_config, AppConfig, CliOverrides};
use errors::JanitorError;
use logging::{append_run_log, init_run_log, structured_fallback_line};
use purge::{purge_queue, spawn_purge_consumer};
use runtime::{ProductionRuntime, QueueService};
use serde_json::json;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use tui::{render_queue_table_lines, run_interactive_list};
use types::{CommandKind, FetchReport};
use worker_pool::{fetch_all_queue_details_with_cancel, CancellationToken};

/// Pending purges the interactive list may queue before Enter blocks.
pub const PURGE_QUEUE_DEPTH: usize = 4;

#[derive(Debug, Clone, Parser)]
#[command(name = "sqs-janitor")]
#[command(about = "List SQS queues with their approximate backlog and purge them")]
pub struct Cli {
    /// Config file (default is $HOME/.sqsjanitor.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, global = true)]
    pub aws_region: Option<String>,
    #[arg(long, global = true)]
    pub aws_access_key_id: Option<String>,
    #[arg(long, global = true)]
    pub aws_secret_access_key: Option<String>,
    #[arg(long, global = true)]
    pub aws_profile: Option<String>,
    /// Override the SQS endpoint, e.g. http://localhost:4566
    #[arg(long, global = true)]
    pub endpoint_url: Option<String>,
    /// Concurrent attribute fetches
    #[arg(long, global = true)]
    pub max_workers: Option<usize>,
    #[arg(long, global = true)]
    pub call_timeout_seconds: Option<u64>,
    #[arg(long, global = true)]
    pub queue_name_prefix: Option<String>,
    /// Append JSONL run events to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Browse queues and purge the selected one with Enter (default)
    Interactive,
    /// Print every queue with its approximate message count
    List,
    /// Purge one queue by URL
    Purge { queue_url: String },
}

impl CliCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Interactive => CommandKind::Interactive,
            Self::List => CommandKind::List,
            Self::Purge { .. } => CommandKind::Purge,
        }
    }
}

pub fn run() -> Result<i32, JanitorError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let env = std::env::vars_os().collect::<Vec<_>>();
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &env, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    env: &[(std::ffi::OsString, std::ffi::OsString)],
    runtime: &ProductionRuntime,
) -> Result<i32, JanitorError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(JanitorError::Cli(error.to_string())),
        },
    };

    let command = cli.command.clone().unwrap_or(CliCommand::Interactive);
    if command.kind() == CommandKind::Interactive && !runtime.terminal.stdin_is_tty() {
        return Err(JanitorError::Cli(
            "interactive mode requires a terminal; use `sqs-janitor list` instead".to_string(),
        ));
    }

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        aws_region: cli.aws_region.clone(),
        aws_access_key_id: cli.aws_access_key_id.clone(),
        aws_secret_access_key: cli.aws_secret_access_key.clone(),
        aws_profile: cli.aws_profile.clone(),
        endpoint_url: cli.endpoint_url.clone(),
        max_workers: cli.max_workers,
        call_timeout_seconds: cli.call_timeout_seconds,
        queue_name_prefix: cli.queue_name_prefix.clone(),
    };
    let home_dir = home_dir_from_env(env);
    let (cfg, config_source) =
        load_config(&overrides, home_dir.as_deref(), runtime.file_system.as_ref())?;

    if let Some(path) = cli.log_file.as_ref().or(cfg.logging.path.as_ref()) {
        init_run_log(path);
    }
    append_run_log(
        "info",
        "command.started",
        json!({
            "command": command.kind().as_str(),
            "config": config_source.as_ref().map(|p| p.display().to_string()),
            "max_workers": cfg.fetch.max_workers,
        }),
    );

    let service = runtime.connector.connect(&cfg)?;

    match command {
        CliCommand::Purge { queue_url } => {
            purge_queue(service.as_ref(), &queue_url)?;
            runtime.terminal.write_line(&format!("purged {queue_url}"))?;
            Ok(0)
        }
        CliCommand::List => {
            let report = fetch_interruptibly(service.as_ref(), &cfg, runtime)?;
            for line in render_queue_table_lines(&report.model) {
                runtime.terminal.write_line(&line)?;
            }
            for failure in &report.failures {
                runtime.terminal.write_line(&structured_fallback_line(
                    &failure.queue_url,
                    "failed",
                    &failure.error.to_string(),
                ))?;
            }
            Ok(0)
        }
        CliCommand::Interactive => {
            let report = fetch_interruptibly(service.as_ref(), &cfg, runtime)?;
            run_interactive(service, report)?;
            Ok(0)
        }
    }
}

pub fn fetch_configured(
    service: &dyn QueueService,
    cfg: &AppConfig,
    cancel: &CancellationToken,
) -> Result<FetchReport, JanitorError> {
    let queue_urls = service.list_queue_urls(cfg.fetch.queue_name_prefix.as_deref())?;
    fetch_all_queue_details_with_cancel(service, &queue_urls, cfg.fetch.max_workers, cancel)
}

/// Fetches while watching for Ctrl-C. An interrupted fetch is an error even
/// though every queue still produced an outcome.
fn fetch_interruptibly(
    service: &dyn QueueService,
    cfg: &AppConfig,
    runtime: &ProductionRuntime,
) -> Result<FetchReport, JanitorError> {
    let cancel = CancellationToken::new();
    let report = {
        let _watching = runtime.interrupts.watch(cancel.clone())?;
        fetch_configured(service, cfg, &cancel)?
    };
    if cancel.is_cancelled() {
        return Err(JanitorError::Cancelled(format!(
            "queue listing after interrupt ({} of {} queues fetched)",
            report.model.len(),
            report.outcome_count()
        )));
    }
    Ok(report)
}

fn run_interactive(service: Arc<dyn QueueService>, report: FetchReport) -> Result<(), JanitorError> {
    let status = if report.failures.is_empty() {
        format!("loaded {} queues", report.model.len())
    } else {
        format!(
            "loaded {} queues; {} failed to load",
            report.model.len(),
            report.failures.len()
        )
    };

    let (purge_tx, purge_rx) = mpsc::sync_channel(PURGE_QUEUE_DEPTH);
    let (notice_tx, notice_rx) = mpsc::channel();
    let consumer = spawn_purge_consumer(service, purge_rx, notice_tx);

    // Returning drops the controller's sender, which lets the consumer finish
    // whatever is still queued and exit.
    let session = run_interactive_list(report.model, purge_tx, Some(notice_rx), status);
    let handled = consumer
        .join()
        .map_err(|_| JanitorError::Io("purge consumer panicked".to_string()))?;
    append_run_log("info", "purge.consumer.finished", json!({ "handled": handled }));
    session
}

fn home_dir_from_env(env: &[(std::ffi::OsString, std::ffi::OsString)]) -> Option<PathBuf> {
    env.iter()
        .find(|(key, _)| key == "HOME" || key == "USERPROFILE")
        .map(|(_, value)| PathBuf::from(value))
        .filter(|path| !path.as_os_str().is_empty())
}
