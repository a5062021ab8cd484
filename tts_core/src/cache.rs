use std::num::NonZeroUsize;

use lru::LruCache;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

/// Fingerprint of the request fields that determine the response payload.
///
/// Only `text`, `speaker_id` and `style` (plus the post-processing
/// discriminator, e.g. `"mp3"`) participate. Tuning parameters such as noise
/// or length scales are deliberately excluded: requests differing only in
/// those share a cached payload.
pub fn response_key(
    text: &str,
    speaker_id: i64,
    style: &str,
    discriminator: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b"_");
    hasher.update(speaker_id.to_string().as_bytes());
    hasher.update(b"_");
    hasher.update(style.as_bytes());
    if let Some(tag) = discriminator {
        hasher.update(b"_");
        hasher.update(tag.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Bounded in-memory map from response fingerprints to final audio payloads.
///
/// Eviction is least-recently-used, sized at construction. Entries otherwise
/// live until [`ResponseCache::clear`] is called on model reload. Concurrent
/// `get`/`put` races on one key are tolerated; the worst case is duplicate
/// computation of a deterministic payload.
pub struct ResponseCache {
    entries: Mutex<LruCache<String, Vec<u8>>>,
}

impl ResponseCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().await.get(key).cloned()
    }

    pub async fn put(&self, key: String, payload: Vec<u8>) {
        self.entries.lock().await.put(key, payload);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_deterministic() {
        let a = response_key("こんにちは", 0, "Neutral", None);
        let b = response_key("こんにちは", 0, "Neutral", None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn key_varies_with_discriminating_fields() {
        let base = response_key("hello", 0, "Neutral", None);
        assert_ne!(base, response_key("hello!", 0, "Neutral", None));
        assert_ne!(base, response_key("hello", 1, "Neutral", None));
        assert_ne!(base, response_key("hello", 0, "Happy", None));
        assert_ne!(base, response_key("hello", 0, "Neutral", Some("mp3")));
    }

    #[tokio::test]
    async fn get_put_clear_round_trip() {
        let cache = ResponseCache::new(NonZeroUsize::new(8).unwrap());
        let key = response_key("a", 0, "Neutral", None);

        assert!(cache.get(&key).await.is_none());
        cache.put(key.clone(), vec![1, 2, 3]).await;
        assert_eq!(cache.get(&key).await, Some(vec![1, 2, 3]));

        cache.clear().await;
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn capacity_bounds_the_map() {
        let cache = ResponseCache::new(NonZeroUsize::new(2).unwrap());
        cache.put("a".into(), vec![0]).await;
        cache.put("b".into(), vec![1]).await;
        cache.put("c".into(), vec![2]).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_none());
        assert!(cache.get("c").await.is_some());
    }
}
