//! Deckhand Daemon
//!
//! Admin sidecar for a containerized game server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use daemon::api::{build_router, AppState};
use daemon::config::Config;
use daemon::probe::StatusProbe;

/// Deckhand Daemon - admin sidecar for a containerized game server.
#[derive(Parser, Debug)]
#[command(name = "deckhand")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for the daemon.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP service until SIGTERM/SIGINT
    Serve {
        /// Override the configured bind address
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Issue one status query and print the snapshot as JSON
    Probe,

    /// Load, validate, and print the resolved configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };

    // Apply environment variable overrides
    config.apply_env_overrides();

    // Initialize tracing; --verbose wins over the configured level
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.daemon.log_level.clone()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(config_path) = &cli.config {
        tracing::info!("Using config file: {:?}", config_path);
    }

    // Validate configuration
    config.validate()?;

    // Handle commands
    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.http.bind_addr = bind;
                config.validate()?;
            }
            serve(config).await?;
        }
        Commands::Probe => {
            let probe = StatusProbe::new(
                config.server.host.clone(),
                config.server.port,
                std::time::Duration::from_secs(config.server.status_timeout_secs),
            );
            let snapshot = probe.probe().await;
            // Reachability is data, not an exit code; the snapshot says it all.
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::CheckConfig => {
            println!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Run the HTTP service until a shutdown signal arrives.
async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Deckhand daemon starting...");
    tracing::info!(
        "Mod directory: {:?}, files directory: {:?}",
        config.paths.mods_dir,
        config.paths.files_dir
    );

    let state = AppState::from_config(&config);
    let router = build_router(state, config.http.max_body_size as usize);

    let listener = tokio::net::TcpListener::bind(&config.http.bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", config.http.bind_addr, e))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    tracing::info!("Deckhand daemon stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to register Ctrl-C handler");
    tracing::info!("Received Ctrl-C");
}
