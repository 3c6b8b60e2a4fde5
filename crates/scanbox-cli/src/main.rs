//! `scanbox` binary: runs the subdomain scan worker or probes a running one.

mod config;

use clap::{Parser, Subcommand};
use config::HarnessConfig;
use scanbox_core::{BuildInfo, WorkerIdentity};
use scanbox_engine::EngineClient;
use scanbox_gateway::{StatusServer, StatusState};
use scanbox_worker::{CommandEnumerator, Harness};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scanbox", about = "Subdomain scan worker for a scan engine")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the worker (default)
    Run,
    /// Probe the status endpoint of a running worker
    Healthcheck {
        /// Status URL to query
        #[arg(long, default_value = "http://127.0.0.1:8080/status")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let default_level = if std::env::var_os("DEBUG").is_some() {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = HarnessConfig::load(cli.config.as_deref())?
                .apply_overrides(|key| std::env::var(key).ok());
            run(config).await
        }
        Commands::Healthcheck { url } => healthcheck(&url).await,
    }
}

async fn run(config: HarnessConfig) -> anyhow::Result<()> {
    let build = BuildInfo::from_env();
    let engine = Arc::new(EngineClient::new(config.engine())?);
    let backend =
        Arc::new(CommandEnumerator::new(config.enumerator.clone())?.with_verbose(config.debug));
    let identity = WorkerIdentity::generate(&config.scanner_type);
    let harness = Harness::new(engine, backend, identity, config.harness());

    // The probe must answer (DOWN) while the self-test is still running.
    let cancel = CancellationToken::new();
    let listener = TcpListener::bind(config.status_addr()).await?;
    let router = StatusServer::build(StatusState {
        tracker: harness.tracker(),
        worker_id: harness.identity().worker_id.clone(),
        started_at: harness.started_at(),
        build: build.clone(),
    });
    let mut server = tokio::spawn(StatusServer::serve(listener, router, cancel.clone()));

    harness.run_self_test().await;
    harness.log_configuration(&config.engine_url, &build);
    let handle = harness.start(cancel.clone());

    tokio::select! {
        _ = shutdown_signal() => info!("Shutdown signal received"),
        res = &mut server => {
            match res {
                Ok(Ok(())) => error!("Status endpoint stopped unexpectedly"),
                Ok(Err(e)) => error!(error = %e, "Status endpoint failed"),
                Err(e) => error!(error = %e, "Status endpoint panicked"),
            }
        }
    }

    handle.shutdown().await;
    if !server.is_finished() {
        match server.await {
            Ok(Err(e)) => error!(error = %e, "Status endpoint failed during shutdown"),
            Err(e) => error!(error = %e, "Status endpoint panicked"),
            Ok(Ok(())) => {}
        }
    }
    info!("Worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn healthcheck(url: &str) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Status endpoint unreachable: {e}"))?;
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("Worker unhealthy: status endpoint answered {status}");
    }
    println!("Worker healthy");
    Ok(())
}
