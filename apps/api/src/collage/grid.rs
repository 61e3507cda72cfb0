//! Grid Layout — places tiles row-major into fixed-size cells on one page side.
//!
//! # Rules
//! - Tiles larger than a cell are shrunk to fit, keeping their aspect ratio.
//! - Tiles that already fit are drawn at natural size (never upscaled).
//! - Absent tiles consume no cell; the cursor advances only on emitted placements.
//! - A row wraps after every `column_count`-th emitted placement. The row step is
//!   `max_cell_height + 2 * vertical_gap`, the column step `max_cell_width + horizontal_gap`.
//!
//! Coordinates are PDF points with the origin at the bottom-left of the page, so
//! moving down a row decreases `y`. The grid origin and every placement's `(x, y)` name
//! the top-left corner of a cell; tiles hang down from the top edge of their cell.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collage::catalog::TileAsset;
use crate::collage::code::TileId;

/// PDF points per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Tabloid page, 11 × 17 in, in points.
pub const PAGE_WIDTH_PT: i64 = 11 * 72;
pub const PAGE_HEIGHT_PT: i64 = 17 * 72;

const EDGE_TOLERANCE: f32 = 1e-3;

// ────────────────────────────────────────────────────────────────────────────
// Layout configuration
// ────────────────────────────────────────────────────────────────────────────

/// Grid parameters shared by both sides of the sheet. All lengths are in points.
///
/// Defaults: credit-card-sized cells (3.25" × 2.0"), three per row, starting 0.75" from
/// the left edge and 15.5" up a tabloid page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub origin_x: f32,
    pub origin_y: f32,
    pub max_cell_width: f32,
    pub max_cell_height: f32,
    pub column_count: usize,
    pub horizontal_gap: f32,
    pub vertical_gap: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 0.75 * POINTS_PER_INCH,
            origin_y: 15.5 * POINTS_PER_INCH,
            max_cell_width: 3.25 * POINTS_PER_INCH,
            max_cell_height: 2.0 * POINTS_PER_INCH,
            column_count: 3,
            horizontal_gap: 0.25 * POINTS_PER_INCH,
            vertical_gap: 0.25 * POINTS_PER_INCH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutConfigError {
    #[error("columnCount must be at least 1")]
    ZeroColumns,

    #[error("cell size must be positive, got {width} x {height}")]
    EmptyCell { width: f32, height: f32 },

    #[error("gaps must not be negative")]
    NegativeGap,
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), LayoutConfigError> {
        if self.column_count == 0 {
            return Err(LayoutConfigError::ZeroColumns);
        }
        if !(self.max_cell_width > 0.0 && self.max_cell_height > 0.0) {
            return Err(LayoutConfigError::EmptyCell {
                width: self.max_cell_width,
                height: self.max_cell_height,
            });
        }
        if self.horizontal_gap < 0.0 || self.vertical_gap < 0.0 {
            return Err(LayoutConfigError::NegativeGap);
        }
        Ok(())
    }

    /// Horizontal cursor advance after each placement.
    pub fn column_step(&self) -> f32 {
        self.max_cell_width + self.horizontal_gap
    }

    /// Vertical cursor advance after each full row.
    pub fn row_step(&self) -> f32 {
        self.max_cell_height + 2.0 * self.vertical_gap
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Placement
// ────────────────────────────────────────────────────────────────────────────

/// Where and how large a tile is drawn. `(x, y)` is the top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub id: TileId,
    pub x: f32,
    pub y: f32,
    pub draw_width: f32,
    pub draw_height: f32,
}

impl Placement {
    /// y of the drawn image's lower edge.
    pub fn bottom(&self) -> f32 {
        self.y - self.draw_height
    }

    /// Whether the drawn rectangle lies entirely on a tabloid page.
    pub fn fits_page(&self) -> bool {
        let (page_w, page_h) = (PAGE_WIDTH_PT as f32, PAGE_HEIGHT_PT as f32);
        self.x >= -EDGE_TOLERANCE
            && self.bottom() >= -EDGE_TOLERANCE
            && self.x + self.draw_width <= page_w + EDGE_TOLERANCE
            && self.y <= page_h + EDGE_TOLERANCE
    }
}

/// Computes the drawn size of an image with the given natural size.
///
/// Oversized images are scaled along the dominant axis: wide images (`r > 1`) take the
/// full cell width, others the full cell height. When that alone would still overflow
/// the other axis the result is shrunk again by the same factor on both axes, so the
/// aspect ratio holds and the size always fits the cell.
pub fn fit_to_cell(natural_width: f32, natural_height: f32, config: &LayoutConfig) -> (f32, f32) {
    let max_w = config.max_cell_width;
    let max_h = config.max_cell_height;

    if natural_width <= max_w && natural_height <= max_h {
        return (natural_width, natural_height);
    }

    let ratio = natural_width / natural_height;
    let (w, h) = if ratio > 1.0 {
        (max_w, max_w / ratio)
    } else {
        (max_h * ratio, max_h)
    };

    if h > max_h {
        (max_h * ratio, max_h)
    } else if w > max_w {
        (max_w, max_w / ratio)
    } else {
        (w, h)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Grid cursor
// ────────────────────────────────────────────────────────────────────────────

/// Row-major cursor. `emitted` counts placements actually produced.
#[derive(Debug, Clone)]
struct GridCursor<'a> {
    config: &'a LayoutConfig,
    x: f32,
    y: f32,
    emitted: usize,
}

impl<'a> GridCursor<'a> {
    fn new(config: &'a LayoutConfig) -> Self {
        Self {
            config,
            x: config.origin_x,
            y: config.origin_y,
            emitted: 0,
        }
    }

    /// Returns the current cell origin, then advances past it.
    fn take_cell(&mut self) -> (f32, f32) {
        let cell = (self.x, self.y);
        self.emitted += 1;
        self.x += self.config.column_step();
        if self.emitted % self.config.column_count == 0 {
            self.x = self.config.origin_x;
            self.y -= self.config.row_step();
        }
        cell
    }
}

/// Lays out one page side.
///
/// `tiles` yields one entry per position in the side's tile list; `None` marks a tile
/// that could not be resolved and is skipped without consuming a cell.
pub fn layout_grid<'t, I>(tiles: I, config: &LayoutConfig) -> Vec<Placement>
where
    I: IntoIterator<Item = Option<&'t TileAsset>>,
{
    let mut cursor = GridCursor::new(config);

    tiles
        .into_iter()
        .flatten()
        .map(|asset| {
            let (draw_width, draw_height) =
                fit_to_cell(asset.width as f32, asset.height as f32, config);
            let (x, y) = cursor.take_cell();
            Placement {
                id: asset.id.clone(),
                x,
                y,
                draw_width,
                draw_height,
            }
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
