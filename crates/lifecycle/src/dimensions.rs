//! Per-asset dimension edits awaiting commit.

use std::collections::HashMap;

use serde::Serialize;

/// Which dimension an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Width,
    Height,
}

/// User-entered dimensions for one asset.
///
/// Values are not validated locally; zero and negative numbers are sent
/// as entered and left to the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DimensionEdit {
    pub width: i64,
    pub height: i64,
}

/// Pending edits keyed by content hash.
#[derive(Debug, Clone, Default)]
pub struct PendingDimensions {
    edits: HashMap<String, DimensionEdit>,
}

impl PendingDimensions {
    /// Sets one field of the edit for `content_hash`, creating it if needed.
    pub fn set(&mut self, content_hash: &str, field: Dimension, value: i64) -> DimensionEdit {
        let edit = self.edits.entry(content_hash.to_string()).or_default();
        match field {
            Dimension::Width => edit.width = value,
            Dimension::Height => edit.height = value,
        }
        *edit
    }

    pub fn get(&self, content_hash: &str) -> Option<DimensionEdit> {
        self.edits.get(content_hash).copied()
    }

    /// Resets an existing edit to `{0, 0}` after a successful commit.
    pub fn reset(&mut self, content_hash: &str) {
        if let Some(edit) = self.edits.get_mut(content_hash) {
            *edit = DimensionEdit::default();
        }
    }

    /// Drops the edit entirely, e.g. once the asset is deleted.
    pub fn forget(&mut self, content_hash: &str) -> Option<DimensionEdit> {
        self.edits.remove(content_hash)
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}
