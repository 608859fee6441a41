use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// TTL'd in-process cache keyed by city id.
///
/// Strictly a read-through accelerator in front of the record store:
/// entries may vanish at any time and every caller must stay correct with
/// an empty cache. Expired entries are dropped lazily on access.
pub struct FastCache<V> {
    entries: Arc<RwLock<HashMap<Uuid, CacheEntry<V>>>>,
    ttl: Duration,
}

impl<V: Clone> FastCache<V> {
    pub fn with_ttl(ttl_seconds: u64) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    pub async fn get(&self, city_id: &Uuid) -> Option<V> {
        let entries = self.entries.read().await;
        if let Some(entry) = entries.get(city_id)
            && entry.expires_at > Instant::now()
        {
            return Some(entry.value.clone());
        }
        None
    }

    pub async fn set(&self, city_id: Uuid, value: V) {
        let mut entries = self.entries.write().await;
        entries.insert(
            city_id,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub async fn remove(&self, city_id: &Uuid) {
        let mut entries = self.entries.write().await;
        entries.remove(city_id);
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }
}
