//! Two-tier cache: an in-process LRU tier backed optionally by Redis.
//!
//! Mirrors the teacher's `MemoryCache`/`RedisCache`/`HybridCache` split:
//! reads check memory first, fall through to Redis on a miss, and backfill
//! memory with a short promotion TTL so a hot Redis key doesn't round-trip
//! the network on every access. Redis is best-effort — if it can't be
//! reached, the cache degrades silently to memory-only.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use chrono::Duration;
use lru::LruCache;
use tracing::warn;
use vclip_models::CacheEntry;

use crate::error::StorageResult;

/// Promotion TTL applied when a Redis hit is copied back into memory.
const PROMOTION_TTL_SECS: i64 = 300;

pub const TTL_ANALYSIS: Duration = Duration::hours(24);
pub const TTL_METADATA: Duration = Duration::hours(168);
pub const TTL_SCENE_IMAGES: Duration = Duration::hours(72);

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub max_bytes: usize,
    pub redis_url: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            max_bytes: 256 * 1024 * 1024,
            redis_url: redis_url_from_env(),
        }
    }
}

/// Builds a `redis://` URL from `REDIS_HOST`/`REDIS_PORT`/`REDIS_PASSWORD`,
/// matching the teacher's host/port/password split. `REDIS_URL` is honored
/// first, for deployments that already hand out a full connection string.
fn redis_url_from_env() -> Option<String> {
    if let Ok(url) = std::env::var("REDIS_URL") {
        return Some(url);
    }
    let host = std::env::var("REDIS_HOST").ok()?;
    let port = std::env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
    match std::env::var("REDIS_PASSWORD") {
        Ok(pass) if !pass.is_empty() => Some(format!("redis://:{pass}@{host}:{port}")),
        _ => Some(format!("redis://{host}:{port}")),
    }
}

struct MemoryCache {
    entries: LruCache<String, CacheEntry>,
    total_bytes: usize,
    max_bytes: usize,
}

impl MemoryCache {
    fn new(max_entries: usize, max_bytes: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries.max(1)).unwrap();
        Self {
            entries: LruCache::new(cap),
            total_bytes: 0,
            max_bytes,
        }
    }

    fn get(&mut self, key: &str) -> Option<CacheEntry> {
        let expired = match self.entries.peek(key) {
            Some(e) => e.is_expired(),
            None => return None,
        };
        if expired {
            if let Some(e) = self.entries.pop(key) {
                self.total_bytes = self.total_bytes.saturating_sub(e.size_bytes);
            }
            return None;
        }
        let entry = self.entries.get_mut(key)?;
        entry.touch();
        Some(entry.clone())
    }

    fn put(&mut self, entry: CacheEntry) {
        if let Some(old) = self.entries.put(entry.key.clone(), entry.clone()) {
            self.total_bytes = self.total_bytes.saturating_sub(old.size_bytes);
        }
        self.total_bytes += entry.size_bytes;

        while self.total_bytes > self.max_bytes {
            match self.entries.pop_lru() {
                Some((_, evicted)) => self.total_bytes = self.total_bytes.saturating_sub(evicted.size_bytes),
                None => break,
            }
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(e) = self.entries.pop(key) {
            self.total_bytes = self.total_bytes.saturating_sub(e.size_bytes);
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.total_bytes = 0;
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Best-effort Redis tier. `None` once a connection attempt fails; callers
/// never retry mid-request, only on the next `TwoTierCache::connect`.
struct RedisTier {
    client: redis::Client,
}

impl RedisTier {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut conn = self.client.get_multiplexed_async_connection().await.ok()?;
        redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<Vec<u8>>>(&mut conn)
            .await
            .ok()
            .flatten()
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) {
        let Ok(mut conn) = self.client.get_multiplexed_async_connection().await else {
            return;
        };
        let _: Result<(), _> = redis::cmd("SETEX")
            .arg(key)
            .arg(ttl.num_seconds().max(1))
            .arg(value)
            .query_async(&mut conn)
            .await;
    }

    async fn delete(&self, key: &str) {
        let Ok(mut conn) = self.client.get_multiplexed_async_connection().await else {
            return;
        };
        let _: Result<(), _> = redis::cmd("DEL").arg(key).query_async(&mut conn).await;
    }
}

pub struct TwoTierCache {
    memory: Mutex<MemoryCache>,
    redis: Option<RedisTier>,
}

impl TwoTierCache {
    pub async fn connect(config: CacheConfig) -> StorageResult<Self> {
        let redis = match &config.redis_url {
            Some(url) => match redis::Client::open(url.as_str()) {
                Ok(client) => match client.get_multiplexed_async_connection().await {
                    Ok(_) => Some(RedisTier { client }),
                    Err(e) => {
                        warn!(error = %e, "redis unreachable, caching memory-only");
                        None
                    }
                },
                Err(e) => {
                    warn!(error = %e, "invalid redis url, caching memory-only");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            memory: Mutex::new(MemoryCache::new(config.max_entries, config.max_bytes)),
            redis,
        })
    }

    pub async fn memory_only(config: CacheConfig) -> Self {
        Self {
            memory: Mutex::new(MemoryCache::new(config.max_entries, config.max_bytes)),
            redis: None,
        }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if let Some(entry) = self.memory.lock().unwrap().get(key) {
            return Some(entry.value);
        }

        let redis = self.redis.as_ref()?;
        let value = redis.get(key).await?;

        let entry = CacheEntry::new(key, value.clone(), Some(Duration::seconds(PROMOTION_TTL_SECS)));
        self.memory.lock().unwrap().put(entry);
        Some(value)
    }

    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let entry = CacheEntry::new(key, value.clone(), Some(ttl));
        self.memory.lock().unwrap().put(entry);

        if let Some(redis) = &self.redis {
            redis.set(key, &value, ttl).await;
        }
    }

    pub async fn delete(&self, key: &str) {
        self.memory.lock().unwrap().remove(key);
        if let Some(redis) = &self.redis {
            redis.delete(key).await;
        }
    }

    pub fn clear_memory(&self) {
        self.memory.lock().unwrap().clear();
    }

    pub fn memory_entry_count(&self) -> usize {
        self.memory.lock().unwrap().len()
    }
}

/// Domain-specific key helpers, folding precision into the key so a
/// precision-5 and precision-9 analysis of the same URL never collide.
pub fn analysis_key(url: &str, precision: u8) -> String {
    format!("analysis:{}:{}", precision, hash_identifier(url))
}

pub fn metadata_key(url: &str) -> String {
    format!("metadata:{}", hash_identifier(url))
}

pub fn scene_images_key(url: &str, precision: u8) -> String {
    format!("scenes:{}:{}", precision, hash_identifier(url))
}

/// Long identifiers (URLs) are hashed down to a fixed-width key component,
/// mirroring the teacher's MD5-keyed cache identifiers.
fn hash_identifier(identifier: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    if identifier.len() <= 60 {
        return identifier.to_string();
    }
    let mut hasher = DefaultHasher::new();
    identifier.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_only_roundtrips() {
        let cache = TwoTierCache::memory_only(CacheConfig {
            max_entries: 10,
            max_bytes: 1024,
            redis_url: None,
        })
        .await;

        cache.set("k", b"hello".to_vec(), Duration::seconds(60)).await;
        assert_eq!(cache.get("k").await, Some(b"hello".to_vec()));

        cache.delete("k").await;
        assert_eq!(cache.get("k").await, None);
    }

    #[tokio::test]
    async fn byte_budget_evicts_lru_entries() {
        let cache = TwoTierCache::memory_only(CacheConfig {
            max_entries: 100,
            max_bytes: 10,
            redis_url: None,
        })
        .await;

        cache.set("a", vec![0u8; 6], Duration::seconds(60)).await;
        cache.set("b", vec![0u8; 6], Duration::seconds(60)).await;

        assert_eq!(cache.get("a").await, None);
        assert!(cache.get("b").await.is_some());
    }

    #[test]
    fn short_identifiers_pass_through_unhashed() {
        assert_eq!(hash_identifier("https://youtu.be/abc"), "https://youtu.be/abc");
    }

    #[test]
    fn analysis_key_differs_by_precision() {
        let url = "https://youtube.com/watch?v=abc123";
        assert_ne!(analysis_key(url, 5), analysis_key(url, 9));
    }
}
