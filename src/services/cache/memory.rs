//! In-process cache used when no `VALKEY_URL` is configured, and in tests.
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::services::cache::client::{CacheClient, CacheError, CacheResult};

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheClient for MemoryCache {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> CacheResult<bool> {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        entries.retain(|_, (_, expires_at)| *expires_at > now);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(true)
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> CacheResult<u64> {
        let now = Instant::now();
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        entries.retain(|_, (_, expires_at)| *expires_at > now);
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| ("0".to_string(), now + ttl));
        let count = entry.0.parse::<u64>().map_err(|_| {
            CacheError::BackendCommand(format!("value at {} is not an integer", key))
        })? + 1;
        entry.0 = count.to_string();
        Ok(count)
    }

    async fn del(&self, key: &str) -> CacheResult<u64> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.remove(key).map_or(0, |_| 1))
    }
}
