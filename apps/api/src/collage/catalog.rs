//! Tile Catalog — read-only mapping from tile identifier to image asset.
//!
//! The catalog only stores paths. Pixel dimensions are known once the file has been
//! opened and decoded by `resolve`, which happens once per distinct tile per render.
//! A missing or undecodable file makes that one tile unavailable; it never poisons the
//! catalog.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::collage::code::TileId;

/// Built-in identifier → relative asset path table.
#[rustfmt::skip]
pub const DEFAULT_TILES: &[(&str, &str)] = &[
    ("tl1",  "assets/tiles/tl2 weight+mass.png"),
    ("tl2",  "assets/tiles/tl3 volume & capacity.png"),
    ("tl3",  "assets/tiles/tl4 Time.png"),
    ("tl4",  "assets/tiles/tl5 speed.png"),
    ("tl5",  "assets/tiles/tl6 energy.png"),
    ("tl6",  "assets/tiles/tl9 power.png"),
    ("tl7",  "assets/tiles/tl10 pressure.png"),
    ("tl8",  "assets/tiles/tl11 didgital storage.png"),
    ("tl9",  "assets/tiles/tl13 angles.png"),
    ("tl10", "assets/tiles/tl14 currency.png"),
    ("tl11", "assets/tiles/tl15 cooking.png"),
    ("tl12", "assets/tiles/tl16 constitutional law.png"),
    ("tl13", "assets/tiles/tl17 contract law.png"),
    ("tl14", "assets/tiles/tl18 criminal law.png"),
    ("tl15", "assets/tiles/tl19 business law.png"),
    ("tl16", "assets/tiles/tl20 property law.png"),
    ("tl17", "assets/tiles/tl21 tort law.png"),
    ("tl18", "assets/tiles/tl22 software development.png"),
    ("tl19", "assets/tiles/tl23 cybersecurity.png"),
    ("tl20", "assets/tiles/tl24 networking basics.png"),
    ("tl21", "assets/tiles/tl25 computer architecture.png"),
    ("tl22", "assets/tiles/tl26 common algorithms.png"),
    ("tl23", "assets/tiles/tl27 data structures.png"),
    ("tl24", "assets/tiles/tl28_basic_programming_concepts.png"),
    ("tl25", "assets/tiles/tl29 cognitive biases.png"),
    ("tl26", "assets/tiles/tl30 learning theories.png"),
    ("tl27", "assets/tiles/tl32 mental health disorders.png"),
    ("tl28", "assets/tiles/tl33 therapeutic approaches.png"),
    ("tl29", "assets/tiles/tl34 syntax.png"),
    ("tl30", "assets/tiles/tl35 phonetics.png"),
    ("tl31", "assets/tiles/tl36 morphology.png"),
    ("tl32", "assets/tiles/tl37 semantics.png"),
    ("tl33", "assets/tiles/tl38 pragmatics.png"),
    ("tl34", "assets/tiles/tl39 advanced vocabulary.png"),
    ("tl35", "assets/tiles/tl40 business vocabulary.png"),
    ("tl36", "assets/tiles/tl41 academic vocabulary.png"),
    ("tl37", "assets/tiles/tl42 common suffixes.png"),
    ("tl38", "assets/tiles/tl43 cooking techniques.png"),
    ("tl39", "assets/tiles/tl44 nutrition; macronutrients.png"),
    ("tl40", "assets/tiles/tl45 herbs & spices.png"),
    ("tl41", "assets/tiles/tl46 dietary requirements.png"),
    ("tl42", "assets/tiles/tl47 food safety.png"),
    ("tl43", "assets/tiles/tl48 10 commandments.png"),
    ("tl44", "assets/tiles/tl49 the beatitudes.png"),
    ("tl45", "assets/tiles/tl50 the fruit of the spirit.png"),
    ("tl46", "assets/tiles/tl51 the lords prayer.png"),
];

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// A catalog tile whose image has been opened. Dimensions are in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TileAsset {
    pub id: TileId,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// A tile asset together with its decoded pixels, shared by layout and rendering.
#[derive(Debug, Clone)]
pub struct ResolvedTile {
    pub asset: TileAsset,
    pub image: DynamicImage,
}

/// Why a tile produced no placement. None of these stops the render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The identifier is not in the catalog.
    UnresolvedTile,
    /// The identifier is known but its file is missing or cannot be decoded.
    AssetUnavailable { detail: String },
    /// The tile resolved, but its grid cell leaves the tile partly or wholly off the page.
    OutsidePage,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read tile catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("tile catalog {path} is not a JSON object of id -> path: {source}")]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Catalog
// ────────────────────────────────────────────────────────────────────────────

/// Immutable tile lookup table. Relative asset paths resolve against `root`.
#[derive(Debug, Clone)]
pub struct TileCatalog {
    root: PathBuf,
    entries: HashMap<TileId, PathBuf>,
}

impl TileCatalog {
    pub fn from_entries<I, K, P>(root: impl Into<PathBuf>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<TileId>,
        P: Into<PathBuf>,
    {
        Self {
            root: root.into(),
            entries: entries
                .into_iter()
                .map(|(id, path)| (id.into(), path.into()))
                .collect(),
        }
    }

    /// The built-in `tl1`..`tl46` table.
    pub fn builtin(root: impl Into<PathBuf>) -> Self {
        Self::from_entries(root, DEFAULT_TILES.iter().copied())
    }

    /// Loads a `{"id": "path", ...}` table from disk.
    pub fn from_json_file(path: &Path, root: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table: HashMap<String, PathBuf> =
            serde_json::from_str(&raw).map_err(|source| CatalogError::Format {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_entries(root, table))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the asset for `id`, if the catalog knows it.
    pub fn path_for(&self, id: &TileId) -> Option<PathBuf> {
        self.entries.get(id).map(|p| self.root.join(p))
    }

    /// Opens and decodes the asset for `id`.
    ///
    /// Blocking: reads the file from disk.
    pub fn resolve(&self, id: &TileId) -> Result<ResolvedTile, SkipReason> {
        let path = self.path_for(id).ok_or(SkipReason::UnresolvedTile)?;

        let image = image::open(&path).map_err(|e| {
            debug!(tile = %id, path = %path.display(), error = %e, "tile asset unavailable");
            SkipReason::AssetUnavailable {
                detail: e.to_string(),
            }
        })?;

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(SkipReason::AssetUnavailable {
                detail: format!("image has no pixels ({width}x{height})"),
            });
        }

        Ok(ResolvedTile {
            asset: TileAsset {
                id: id.clone(),
                path,
                width,
                height,
            },
            image,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
