//! In-memory asset collection, replaced wholesale after every list fetch.

use std::collections::HashSet;

use assetdeck_protocol::Asset;
use tracing::warn;

/// Ordered asset collection keyed by content hash.
///
/// The only public mutation is [`replace_all`](Self::replace_all); the
/// client never patches entries from partial responses.
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    assets: Vec<Asset>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents with `assets`, keeping server order.
    ///
    /// A hash repeated by the server keeps its first occurrence.
    pub fn replace_all(&mut self, assets: Vec<Asset>) {
        let mut seen = HashSet::with_capacity(assets.len());
        let mut unique = Vec::with_capacity(assets.len());
        for asset in assets {
            if seen.insert(asset.content_hash.clone()) {
                unique.push(asset);
            } else {
                warn!(hash = %asset.content_hash, "duplicate content hash in list, dropped");
            }
        }
        self.assets = unique;
    }

    /// Drops the entry for `content_hash`. Returns `true` if one was removed.
    pub(crate) fn remove(&mut self, content_hash: &str) -> bool {
        let len_before = self.assets.len();
        self.assets.retain(|a| a.content_hash != content_hash);
        self.assets.len() != len_before
    }

    pub fn get(&self, content_hash: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.content_hash == content_hash)
    }

    pub fn contains(&self, content_hash: &str) -> bool {
        self.get(content_hash).is_some()
    }

    /// Iterate in server order.
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.iter()
    }

    pub fn as_slice(&self) -> &[Asset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
