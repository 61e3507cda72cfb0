mod collage;
mod config;
mod errors;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::collage::{ArtifactSink, DirectorySink, InMemorySink};
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tilesheet v{}", env!("CARGO_PKG_VERSION"));

    let catalog = config.load_catalog()?;
    info!(
        tiles = catalog.len(),
        root = %catalog.root().display(),
        "Tile catalog loaded"
    );
    if catalog.is_empty() {
        warn!("Tile catalog is empty; every collage will be blank");
    }

    let layout = config.load_layout()?;
    info!(
        columns = layout.column_count,
        cell_width = layout.max_cell_width,
        cell_height = layout.max_cell_height,
        "Layout config loaded"
    );

    let sink: Arc<dyn ArtifactSink> = match &config.archive_dir {
        Some(dir) => {
            let sink = DirectorySink::new(dir)?;
            info!("Archiving generated collages to {}", sink.dir().display());
            Arc::new(sink)
        }
        None => Arc::new(InMemorySink),
    };

    let state = AppState {
        catalog: Arc::new(catalog),
        layout: Arc::new(layout),
        sink,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
