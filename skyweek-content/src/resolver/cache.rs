//! In-process TTL cache for weekly content
//!
//! An entry expires after the TTL or when its week ends, whichever comes
//! first. Reads never return an expired entry; `purge_expired` reclaims them.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use skyweek_common::time::week_end;
use std::collections::HashMap;
use std::hash::Hash;
use tokio::sync::RwLock;

struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Expiry for an entry inserted at `now` for the week starting `week_start`
    pub fn expiry_for(&self, week_start: NaiveDate, now: DateTime<Utc>) -> DateTime<Utc> {
        (now + self.ttl).min(week_end(week_start))
    }

    pub async fn get(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, key: K, value: V, week_start: NaiveDate, now: DateTime<Utc>) {
        let expires_at = self.expiry_for(week_start, now);
        if expires_at <= now {
            return;
        }
        self.entries
            .write()
            .await
            .insert(key, CacheEntry { value, expires_at });
    }

    /// Drop every expired entry, returning how many went
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
