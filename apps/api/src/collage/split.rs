//! Page Splitter — divides the ordered tile list between the two sides of the sheet.

use serde::{Deserialize, Serialize};

/// One of the two physical faces of a printed sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

/// Splits `list` at `floor(len / 2)`.
///
/// The back side receives the extra element of an odd-length list.
/// `front ++ back` always equals `list`.
pub fn split_sides<T>(list: &[T]) -> (&[T], &[T]) {
    list.split_at(list.len() / 2)
}
