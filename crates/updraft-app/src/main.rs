//! Updraft - self-update service for desktop applications.
//!
//! This is the main binary:
//! - Local HTTP API + event stream (for the application UI)
//! - Background update flow at startup and on an interval
//! - Native install/error dialogs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use directories::ProjectDirs;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tokio::sync::Notify;

use updraft_app::{environment, DesktopNotifier, RfdDialogs, UpdaterConfig};
use updraft_core::{AppInfo, AutoUpdateOutcome, UpdateOrchestrator};
use updraft_github::GitHubBackend;
use updraft_server::{AppState, BroadcastWindow, Server, ServerConfig};

/// Updraft - self-update service for desktop applications
#[derive(Parser, Debug)]
#[command(name = "updraft", version, about)]
struct Args {
    /// Settings file (default: <config dir>/updater.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port of the local API
    #[arg(long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Skip the background update flow
    #[arg(long)]
    no_check: bool,

    /// Treat this build as packaged
    #[arg(long)]
    force_packaged: bool,
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "updraft", "Updraft").map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with file rotation.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_level = if args.debug { "debug" } else { &args.log_level };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "updraft={0},updraft_app={0},updraft_core={0},updraft_github={0},updraft_server={0},warn",
            log_level
        ))
    });

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("updraft")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                if args.debug {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(std::io::stdout))
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                } else {
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                }

                tracing::info!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::warn!("File logging unavailable, using console only");
    None
}

/// Loads settings and applies command line overrides.
fn load_config(args: &Args) -> anyhow::Result<UpdaterConfig> {
    let mut config = match args.config.clone().or_else(UpdaterConfig::default_path) {
        Some(path) => {
            tracing::info!("Settings file {:?}", path);
            UpdaterConfig::load(&path)?
        }
        None => {
            tracing::warn!("No config directory, using default settings");
            UpdaterConfig::default()
        }
    };

    if let Some(port) = args.port {
        config.port = port;
    }
    if args.force_packaged {
        config.force_packaged = true;
    }
    if args.no_check {
        config.check_on_startup = false;
    }

    Ok(config)
}

/// Runs the background flow now and then every `interval`.
async fn run_update_loop(orchestrator: UpdateOrchestrator, interval: Option<Duration>) {
    loop {
        match orchestrator.auto_update().await {
            Ok(AutoUpdateOutcome::NotPackaged) => return,
            Ok(outcome) => tracing::info!(?outcome, "Background update finished"),
            Err(e) => tracing::warn!(error = %e, "Background update failed"),
        }

        let Some(interval) = interval else {
            return;
        };
        tokio::time::sleep(interval).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep the guard alive for the duration of the program
    let _log_guard = init_logging(&args);

    tracing::info!("Starting Updraft...");
    tracing::info!("Args: {:?}", args);

    let config = load_config(&args)?;

    let version = env!("CARGO_PKG_VERSION");
    let packaged = config.force_packaged || environment::is_packaged();
    tracing::info!(version, packaged, "Application identity");

    let feed = config.feed.clone().current_version(version);
    let exit_signal = Arc::new(Notify::new());
    let backend = Arc::new(GitHubBackend::new(feed)?.with_exit_signal(exit_signal.clone()));
    let window = Arc::new(BroadcastWindow::default());

    let mut orchestrator = UpdateOrchestrator::new(
        backend,
        window.clone(),
        Arc::new(RfdDialogs::new()),
        AppInfo::new(config.app_name.clone(), version, packaged),
        config.orchestrator.clone(),
    );
    if config.notifications {
        orchestrator =
            orchestrator.with_notifier(Arc::new(DesktopNotifier::new(config.app_name.clone())));
    }
    let _bridge = orchestrator.attach();

    let server = Server::new(
        ServerConfig::default().with_port(config.port),
        AppState::new(orchestrator.clone(), window),
    )?;
    let server_task = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!("API server error: {}", e);
        }
    });

    if config.check_on_startup {
        let interval = (config.check_interval_secs > 0)
            .then(|| Duration::from_secs(config.check_interval_secs));
        tokio::spawn(run_update_loop(orchestrator, interval));
    } else {
        tracing::info!("Background update check disabled");
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = exit_signal.notified() => tracing::info!("Installer running, exiting"),
    }

    server_task.abort();
    tracing::info!("Updraft shutting down");
    Ok(())
}
