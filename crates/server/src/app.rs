//! Application state, routes, and the server entry point.

use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context as _;
use dbexport_core::ExportConfig;
use dbexport_durability::{CancellationToken, TempFileReaper};
use tracing::info;

use crate::handlers;
use crate::orchestrator::ExportOrchestrator;

/// Default streaming chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Shared by every worker.
#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Arc<ExportOrchestrator>,
    pub chunk_size: usize,
}

impl AppState {
    pub fn new(orchestrator: ExportOrchestrator, chunk_size: usize) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            chunk_size,
        }
    }

    pub fn from_config(config: &ExportConfig) -> anyhow::Result<Self> {
        let orchestrator = ExportOrchestrator::from_config(config)?;
        Ok(Self::new(orchestrator, config.chunk_size))
    }
}

/// Register the export routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/{database}/-/export-database",
        web::get().to(handlers::export_database),
    )
    .route("/{database}", web::get().to(handlers::database_page));
}

/// Serve until the process is told to stop.
///
/// The reaper sweeps the export directory once at startup and then on its
/// interval; it is stopped and joined before this returns.
pub async fn run(config: ExportConfig) -> anyhow::Result<()> {
    config.validate()?;
    let export_dir = config.export_dir();
    std::fs::create_dir_all(&export_dir).with_context(|| {
        format!("Failed to create export directory {}", export_dir.display())
    })?;
    let state = web::Data::new(AppState::from_config(&config)?);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(config.bind.as_str())
    .with_context(|| format!("Failed to bind {}", config.bind))?
    .run();

    let reaper = TempFileReaper::from_config(&export_dir, &config.reaper)
        .spawn(CancellationToken::new());
    info!(
        bind = %config.bind,
        export_dir = %export_dir.display(),
        databases = config.databases.len(),
        "dbexport listening"
    );

    let result = server.await;
    reaper.shutdown().await;
    info!("dbexport stopped");
    result.map_err(Into::into)
}
