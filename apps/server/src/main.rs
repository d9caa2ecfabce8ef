#![warn(clippy::all, clippy::pedantic)]

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use clap::Parser;
use tokio_util::sync::CancellationToken;

mod error;
mod routes;
mod state;

use error::AppError;
use logger::init_tracing;
use ravenwatch::config::DEFAULT_CONFIG_PATH;
use ravenwatch::{CheckExecutor, ConfigFile, DeviceRegistry, MonitoringEngine, MonitoringScheduler, TeamsWebhook};
use state::AppState;

/// Network and RAVENNA device monitor with a live dashboard API
#[derive(Debug, Parser)]
#[command(name = "ravenwatch-server", version, about)]
struct Cli {
    /// Configuration document, created with defaults when missing
    #[arg(short, long, env = "RAVENWATCH_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Bind host, overrides `server.host`
    #[arg(long, env = "RAVENWATCH_HOST")]
    host: Option<String>,

    /// Bind port, overrides `server.port`
    #[arg(short, long, env = "RAVENWATCH_PORT")]
    port: Option<u16>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let file = ConfigFile::new(&cli.config);
    let config = file.load()?;
    tracing::info!(path = %file.path().display(), "{config}");

    let host = cli.host.unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);

    let registry = DeviceRegistry::new(Arc::new(file), config);
    let engine = Arc::new(MonitoringEngine::new(
        registry,
        Arc::new(CheckExecutor::new()?),
        Arc::new(TeamsWebhook::new()?),
    ));

    let shutdown = CancellationToken::new();
    let (scheduler, scheduler_task) = MonitoringScheduler::new(engine.clone(), shutdown.clone()).spawn();
    let state = web::Data::new(AppState { engine, scheduler });

    let served = run_server(state, &host, port).await;

    shutdown.cancel();
    if let Err(e) = scheduler_task.await {
        tracing::warn!(error = %e, "Scheduler task ended abnormally");
    }

    served?;
    Ok(())
}

async fn run_server(state: web::Data<AppState>, host: &str, port: u16) -> Result<(), AppError> {
    tracing::info!(host, port, "Starting HTTP server");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes::routes))
        .bind((host, port))?
        .run()
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
