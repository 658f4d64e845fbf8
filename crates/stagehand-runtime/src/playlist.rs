//! Playlist-file content provider.
//!
//! Catalog discovery and recommendation live outside this repository; the
//! daemon just rotates through a local playlist file. An empty playlist
//! fails the request, which the controller answers with the fallback item.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use stagehand_controller::{ContentError, ContentProvider};
use stagehand_core::types::PlayableItem;

pub struct PlaylistProvider {
    items: Vec<PlayableItem>,
    cursor: AtomicUsize,
    fallback: PlayableItem,
}

impl PlaylistProvider {
    pub fn from_items(items: Vec<PlayableItem>, fallback: PlayableItem) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
            fallback,
        }
    }

    /// Load a playlist file (JSON array of items). A missing or invalid
    /// file logs and yields an empty playlist rather than failing startup.
    pub fn load(path: Option<&Path>, fallback: PlayableItem) -> Self {
        let items = match path {
            None => {
                tracing::info!("no playlist configured; relying on fallback item");
                Vec::new()
            }
            Some(path) => match std::fs::read_to_string(path) {
                Ok(raw) => match serde_json::from_str::<Vec<PlayableItem>>(&raw) {
                    Ok(items) => {
                        tracing::info!(count = items.len(), path = %path.display(), "playlist loaded");
                        items
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), "playlist unreadable: {e}");
                        Vec::new()
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), "playlist missing: {e}");
                    Vec::new()
                }
            },
        };
        Self::from_items(items, fallback)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ContentProvider for PlaylistProvider {
    async fn request_next(&self) -> Result<PlayableItem, ContentError> {
        if self.items.is_empty() {
            return Err(ContentError::Unavailable("playlist empty".to_owned()));
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.items.len();
        Ok(self.items[index].clone())
    }

    fn fallback_item(&self) -> PlayableItem {
        self.fallback.clone()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
