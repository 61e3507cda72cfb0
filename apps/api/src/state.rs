use std::sync::Arc;

use crate::collage::{ArtifactSink, LayoutConfig, TileCatalog};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Read-only tile table, built once at startup.
    pub catalog: Arc<TileCatalog>,
    /// Grid parameters shared by both sides of every sheet.
    pub layout: Arc<LayoutConfig>,
    /// Where finished PDFs go. In-memory unless an archive directory is configured.
    pub sink: Arc<dyn ArtifactSink>,
}
