//! Document Assembler — parse → split → resolve → lay out each side.
//!
//! Produces the two-page `Document` plus everything the renderer needs: the decoded
//! tile images and the list of tiles that were omitted. Each distinct tile is resolved
//! at most once per call, however often it appears in the code.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::collage::catalog::{ResolvedTile, SkipReason, TileAsset, TileCatalog};
use crate::collage::code::{parse_code, ParseError, TileId};
use crate::collage::grid::{layout_grid, LayoutConfig, Placement};
use crate::collage::split::{split_sides, Side};

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// One physical side of the sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub side: Side,
    pub placements: Vec<Placement>,
}

/// The finished layout: front page first, back page second.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub front: Page,
    pub back: Page,
}

impl Document {
    /// Pages in print order.
    pub fn pages(&self) -> [&Page; 2] {
        [&self.front, &self.back]
    }
}

/// A tile that produced no placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Omission {
    pub side: Side,
    /// Position within the side's tile list.
    pub index: usize,
    pub id: TileId,
    pub reason: SkipReason,
}

/// Assembled document plus the resources needed to render it.
#[derive(Debug, Clone)]
pub struct Collage {
    pub document: Document,
    pub omissions: Vec<Omission>,
    /// Decoded images for every tile that resolved.
    pub tiles: HashMap<TileId, ResolvedTile>,
}

// ────────────────────────────────────────────────────────────────────────────
// Assembly
// ────────────────────────────────────────────────────────────────────────────

/// Builds the two-sided collage for `code`.
///
/// Fails only on a malformed code. Unknown ids, unreadable assets and tiles whose cell
/// falls off the page are recorded in `Collage::omissions` and otherwise ignored.
///
/// Blocking: decodes tile images from disk.
pub fn assemble_collage(
    code: &str,
    catalog: &TileCatalog,
    config: &LayoutConfig,
) -> Result<Collage, ParseError> {
    let ids = parse_code(code)?;
    let (front_ids, back_ids) = split_sides(&ids);

    let mut resolved: HashMap<TileId, Result<ResolvedTile, SkipReason>> = HashMap::new();
    for id in &ids {
        if !resolved.contains_key(id) {
            resolved.insert(id.clone(), catalog.resolve(id));
        }
    }

    let mut omissions = Vec::new();
    let front = layout_side(Side::Front, front_ids, &resolved, config, &mut omissions);
    let back = layout_side(Side::Back, back_ids, &resolved, config, &mut omissions);

    for omission in &omissions {
        warn!(
            side = ?omission.side,
            index = omission.index,
            tile = %omission.id,
            reason = ?omission.reason,
            "tile omitted from collage"
        );
    }

    let tiles: HashMap<TileId, ResolvedTile> = resolved
        .into_iter()
        .filter_map(|(id, result)| result.ok().map(|tile| (id, tile)))
        .collect();

    info!(
        requested = ids.len(),
        front = front.placements.len(),
        back = back.placements.len(),
        omitted = omissions.len(),
        "collage assembled"
    );

    Ok(Collage {
        document: Document { front, back },
        omissions,
        tiles,
    })
}

fn layout_side(
    side: Side,
    ids: &[TileId],
    resolved: &HashMap<TileId, Result<ResolvedTile, SkipReason>>,
    config: &LayoutConfig,
    omissions: &mut Vec<Omission>,
) -> Page {
    let mut skip = |index: usize, id: &TileId, reason: SkipReason| {
        omissions.push(Omission {
            side,
            index,
            id: id.clone(),
            reason,
        });
    };

    let assets: Vec<Option<&TileAsset>> = ids
        .iter()
        .enumerate()
        .map(|(index, id)| match resolved.get(id) {
            Some(Ok(tile)) => Some(&tile.asset),
            Some(Err(reason)) => {
                skip(index, id, reason.clone());
                None
            }
            None => {
                skip(index, id, SkipReason::UnresolvedTile);
                None
            }
        })
        .collect();

    let emitted_indices = assets
        .iter()
        .enumerate()
        .filter_map(|(index, asset)| asset.map(|_| index));

    // The grid keeps advancing past the bottom edge; those cells would not print.
    let mut placements = Vec::new();
    for (index, placement) in emitted_indices.zip(layout_grid(assets.iter().copied(), config)) {
        if placement.fits_page() {
            placements.push(placement);
        } else {
            skip(index, &placement.id, SkipReason::OutsidePage);
        }
    }

    Page { side, placements }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
