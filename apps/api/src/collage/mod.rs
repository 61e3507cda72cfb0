// Collage engine: code parsing, catalog lookup, two-sided grid layout, PDF rendering.
// Catalog resolution and rendering block on disk and CPU; handlers run them inside
// tokio::task::spawn_blocking.

pub mod archive;
pub mod assembler;
pub mod catalog;
pub mod code;
pub mod grid;
pub mod handlers;
pub mod render;
pub mod split;

// Re-export the public API consumed by the server setup and handlers.
pub use archive::{ArtifactSink, DirectorySink, InMemorySink};
pub use catalog::TileCatalog;
pub use grid::LayoutConfig;
