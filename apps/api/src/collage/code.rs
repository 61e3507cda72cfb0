//! Code Parser — decodes a collage code into the ordered list of tile identifiers.
//!
//! # Format
//! `label1:id1|label2:id2|...|labelN:idN`
//!
//! Pair-tokens are separated by `|`; each pair-token holds exactly one `:`.
//! The label is ignored. Order and duplicates are preserved.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const PAIR_DELIMITER: char = '|';
const LABEL_DELIMITER: char = ':';

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Opaque catalog key for a single tile image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(String);

impl TileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TileId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TileId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("pair {position} ({token:?}) has no ':' between label and tile id")]
    MissingDelimiter { position: usize, token: String },

    #[error("pair {position} ({token:?}) has more than one ':'")]
    ExtraDelimiter { position: usize, token: String },
}

impl ParseError {
    /// Zero-based index of the offending pair-token.
    pub fn position(&self) -> usize {
        match self {
            ParseError::MissingDelimiter { position, .. }
            | ParseError::ExtraDelimiter { position, .. } => *position,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing
// ────────────────────────────────────────────────────────────────────────────

/// Parses a collage code into its ordered tile identifiers.
///
/// Whitespace around the whole code is trimmed (form inputs often carry a trailing
/// newline); whitespace inside a pair-token is kept verbatim. An empty code is an
/// empty list, not an error.
pub fn parse_code(code: &str) -> Result<Vec<TileId>, ParseError> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(Vec::new());
    }

    code.split(PAIR_DELIMITER)
        .enumerate()
        .map(|(position, token)| parse_pair(position, token))
        .collect()
}

fn parse_pair(position: usize, token: &str) -> Result<TileId, ParseError> {
    let mut parts = token.split(LABEL_DELIMITER);
    // `split` always yields at least one item; the label is discarded.
    let _label = parts.next();

    let id = parts.next().ok_or_else(|| ParseError::MissingDelimiter {
        position,
        token: token.to_string(),
    })?;

    if parts.next().is_some() {
        return Err(ParseError::ExtraDelimiter {
            position,
            token: token.to_string(),
        });
    }

    Ok(TileId::new(id))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
