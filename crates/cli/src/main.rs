// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! adaptor-runtime - supervisory harness driving an adaptor lifecycle.
//!
//! `run` executes start → run → stop → cleanup in the foreground.
//! `daemon` splits the lifecycle across processes: `start` spawns a
//! backend (the hidden `_serve` reentry) and starts the adaptor, `run`
//! executes one task against it, `stop` tears it down. Cancellation is
//! wired to interruption signals in every mode.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod backend_process;
mod data;
mod env;
mod frontend;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use tracing::{error, info};

use adaptor_adapters::CommandAdaptor;
use adaptor_core::{rules_from_data, AdaptorError, AdaptorRunner, RuntimeConfig};
use adaptor_daemon::logging::{init_logging, AdaptorLogLayer};
use adaptor_daemon::{BackendRunner, InMemoryLogBuffer, LogBuffer};

use crate::data::DataMap;
use crate::frontend::FrontendRunner;

#[derive(Parser)]
#[command(
    name = "adaptor-runtime",
    version,
    about = "Adaptor runtime - drives an application adaptor through its lifecycle"
)]
struct Cli {
    /// Print the adaptor runtime configuration, then exit
    #[arg(long)]
    show_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the adaptor lifecycle in the foreground
    Run(RunArgs),
    /// Drive an adaptor hosted in a background process
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Data to pass to the adaptor during initialization (JSON string or file://path)
    #[arg(long, value_parser = data::parse_data, default_value = "")]
    init_data: DataMap,

    /// Path mapping rules to make available to the adaptor (JSON string or file://path)
    #[arg(long, value_parser = data::parse_data, default_value = "")]
    path_mapping_rules: DataMap,

    /// Data to pass to the adaptor when it is being run (JSON string or file://path)
    #[arg(long, value_parser = data::parse_data, default_value = "")]
    run_data: DataMap,
}

#[derive(Subcommand)]
enum DaemonCommand {
    /// Host the backend server (reentry command used by `daemon start`)
    #[command(name = "_serve", hide = true)]
    Serve {
        #[arg(long, value_parser = data::parse_data, default_value = "")]
        init_data: DataMap,
        #[arg(long, value_parser = data::parse_data, default_value = "")]
        path_mapping_rules: DataMap,
        /// File path where the backend publishes its endpoint
        #[arg(long)]
        connection_file: PathBuf,
    },
    /// Spawn a backend process and start the adaptor
    Start {
        #[arg(long, value_parser = data::parse_data, default_value = "")]
        init_data: DataMap,
        #[arg(long, value_parser = data::parse_data, default_value = "")]
        path_mapping_rules: DataMap,
        #[arg(long)]
        connection_file: PathBuf,
    },
    /// Run one task on the started adaptor
    Run {
        #[arg(long, value_parser = data::parse_data, default_value = "")]
        run_data: DataMap,
        #[arg(long)]
        connection_file: PathBuf,
    },
    /// Stop the adaptor and shut the backend down
    Stop {
        #[arg(long)]
        connection_file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = RuntimeConfig::load().context("Failed to load runtime configuration")?;

    if cli.show_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        std::process::exit(2);
    };

    match command {
        Commands::Run(args) => run_command(&config, args).await,
        Commands::Daemon { command } => match command {
            DaemonCommand::Serve {
                init_data,
                path_mapping_rules,
                connection_file,
            } => serve_command(&config, init_data, path_mapping_rules, connection_file).await,
            DaemonCommand::Start {
                init_data,
                path_mapping_rules,
                connection_file,
            } => {
                init_frontend_logging(&config)?;
                let frontend = frontend_with_signals(connection_file);
                frontend.init(&init_data, &path_mapping_rules, None).await?;
                frontend.start().await?;
                Ok(())
            }
            DaemonCommand::Run {
                run_data,
                connection_file,
            } => {
                init_frontend_logging(&config)?;
                let frontend = frontend_with_signals(connection_file);
                frontend.run(&run_data).await?;
                Ok(())
            }
            DaemonCommand::Stop { connection_file } => {
                init_frontend_logging(&config)?;
                let frontend = frontend_with_signals(connection_file);
                frontend.stop().await?;
                frontend.shutdown().await?;
                Ok(())
            }
        },
    }
}

/// Foreground mode: the whole lifecycle inline, with cleanup on failure.
async fn run_command(config: &RuntimeConfig, args: RunArgs) -> Result<()> {
    init_logging(AdaptorLogLayer::stdout(), &effective_log_level(config)?)
        .context("Failed to initialize logging")?;

    let rules = rules_from_data(&args.path_mapping_rules)
        .context("Failed to parse path mapping rules")?;
    let adaptor = Arc::new(CommandAdaptor::new(&args.init_data, rules)?);
    let runner = AdaptorRunner::new(adaptor);

    spawn_signal_task({
        let runner = runner.clone();
        move || {
            let runner = runner.clone();
            async move {
                let _ = runner.cancel().await;
            }
        }
    });

    match lifecycle(&runner, &args.run_data).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Error running the adaptor: {e}");
            if let Err(cleanup_err) = runner.cleanup().await {
                error!("Error cleaning up the adaptor: {cleanup_err}");
            }
            Err(e.into())
        }
    }
}

async fn lifecycle(runner: &AdaptorRunner, run_data: &DataMap) -> Result<(), AdaptorError> {
    runner.start().await?;
    runner.run(run_data).await?;
    runner.stop().await?;
    runner.cleanup().await
}

/// Backend mode: stdout goes silent, all output flows through the buffer.
async fn serve_command(
    config: &RuntimeConfig,
    init_data: DataMap,
    path_mapping_rules: DataMap,
    connection_file: PathBuf,
) -> Result<()> {
    let buffer: Arc<InMemoryLogBuffer> = Arc::new(InMemoryLogBuffer::new());
    init_logging(
        AdaptorLogLayer::buffered(Arc::clone(&buffer) as Arc<dyn LogBuffer>),
        &effective_log_level(config)?,
    )
    .context("Failed to initialize logging")?;

    let rules = rules_from_data(&path_mapping_rules)
        .context("Failed to parse path mapping rules")?;
    let adaptor = Arc::new(CommandAdaptor::new(&init_data, rules)?);
    let runner = AdaptorRunner::new(adaptor);

    let connection_file = absolutize(connection_file)?;
    BackendRunner::new(runner, connection_file, Some(buffer as Arc<dyn LogBuffer>))
        .run()
        .await?;
    Ok(())
}

fn init_frontend_logging(config: &RuntimeConfig) -> Result<()> {
    init_logging(AdaptorLogLayer::stdout(), &config.log_level)
        .context("Failed to initialize logging")
}

/// Build the frontend and wire interruption signals to its cancel path.
fn frontend_with_signals(connection_file: PathBuf) -> FrontendRunner {
    let frontend = FrontendRunner::new(connection_file);
    spawn_signal_task({
        let frontend = frontend.clone();
        move || {
            let frontend = frontend.clone();
            async move {
                let _ = frontend.cancel().await;
            }
        }
    });
    frontend
}

/// The single global subscriber serves both the runtime and the adaptor,
/// so it filters at the more verbose of the two configured levels.
fn effective_log_level(config: &RuntimeConfig) -> Result<String> {
    const VERBOSITY: [&str; 5] = ["ERROR", "WARN", "INFO", "DEBUG", "TRACE"];

    let adaptor_level = config.adaptor_log_level("CommandAdaptor")?;
    let rank = |level: &str| VERBOSITY.iter().position(|known| *known == level).unwrap_or(2);

    let level = if rank(&adaptor_level) > rank(&config.log_level) {
        adaptor_level
    } else {
        config.log_level.clone()
    };
    Ok(level)
}

fn absolutize(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path);
    }
    let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
    Ok(cwd.join(path))
}

/// Interruption signals kick off the cancel workflow in every mode.
#[cfg(unix)]
fn spawn_signal_task<F, Fut>(action: F)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let (Ok(mut sigint), Ok(mut sigterm)) =
            (signal(SignalKind::interrupt()), signal(SignalKind::terminate()))
        else {
            return;
        };

        loop {
            tokio::select! {
                _ = sigint.recv() => {}
                _ = sigterm.recv() => {}
            }
            info!("Interruption signal received.");
            action().await;
        }
    });
}

#[cfg(windows)]
fn spawn_signal_task<F, Fut>(action: F)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let Ok(mut ctrl_break) = tokio::signal::windows::ctrl_break() else {
            return;
        };

        while ctrl_break.recv().await.is_some() {
            info!("Interruption signal received.");
            action().await;
        }
    });
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
