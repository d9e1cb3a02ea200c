//! Short-lived in-memory store for synthesized audio.
//!
//! Audio handles are single-use and time-boxed: the telephony provider
//! fetches the bytes once, shortly after synthesis. Entries are immutable
//! once created, so expiry under concurrent inserts needs no coordination
//! beyond the map lock.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Entries older than this are unreachable and swept.
pub const AUDIO_TTL_SECONDS: i64 = 5 * 60;

/// A cached audio blob.
#[derive(Debug, Clone)]
pub struct StoredAudio {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

/// Shared audio cache keyed by random opaque handles.
///
/// Uses `std::sync::RwLock` intentionally: all lock acquisitions are brief
/// HashMap operations that never span `.await` points.
#[derive(Debug, Clone, Default)]
pub struct AudioCache {
    entries: Arc<RwLock<HashMap<String, StoredAudio>>>,
}

impl AudioCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an audio blob and returns its opaque handle.
    pub fn insert(&self, bytes: Vec<u8>, mime_type: impl Into<String>) -> String {
        self.insert_at(bytes, mime_type, Utc::now())
    }

    /// Stores an audio blob with an explicit creation timestamp. Test
    /// seam for exercising expiry without waiting out the TTL.
    #[doc(hidden)]
    pub fn insert_at(
        &self,
        bytes: Vec<u8>,
        mime_type: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        self.entries.write().expect("audio cache poisoned").insert(
            id.clone(),
            StoredAudio {
                bytes,
                mime_type: mime_type.into(),
                created_at,
            },
        );
        id
    }

    /// Returns the audio for `id`, or `None` if unknown or past the TTL.
    /// An expired entry is unreachable even before the sweep removes it.
    pub fn get(&self, id: &str) -> Option<StoredAudio> {
        let entries = self.entries.read().expect("audio cache poisoned");
        let entry = entries.get(id)?;
        if Utc::now() - entry.created_at > Duration::seconds(AUDIO_TTL_SECONDS) {
            return None;
        }
        Some(entry.clone())
    }

    /// Deletes expired entries and returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let cutoff = Utc::now() - Duration::seconds(AUDIO_TTL_SECONDS);
        let mut entries = self.entries.write().expect("audio cache poisoned");
        let before = entries.len();
        entries.retain(|_, audio| audio.created_at >= cutoff);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("audio cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entries_are_retrievable() {
        let cache = AudioCache::new();
        let id = cache.insert(vec![1, 2, 3], "audio/mpeg");
        let stored = cache.get(&id).expect("entry should be present");
        assert_eq!(stored.bytes, vec![1, 2, 3]);
        assert_eq!(stored.mime_type, "audio/mpeg");
    }

    #[test]
    fn unknown_handle_yields_none() {
        let cache = AudioCache::new();
        assert!(cache.get("not-a-handle").is_none());
    }

    #[test]
    fn expired_entries_are_unreachable_before_the_sweep() {
        let cache = AudioCache::new();
        let stale = Utc::now() - Duration::seconds(AUDIO_TTL_SECONDS + 1);
        let id = cache.insert_at(vec![0u8; 8], "audio/mpeg", stale);
        assert!(cache.get(&id).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let cache = AudioCache::new();
        let stale = Utc::now() - Duration::seconds(AUDIO_TTL_SECONDS + 1);
        cache.insert_at(vec![0u8; 8], "audio/mpeg", stale);
        let fresh = cache.insert(vec![1u8; 8], "audio/mpeg");

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&fresh).is_some());
    }
}
