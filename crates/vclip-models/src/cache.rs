//! The Tier-1 cache's entry record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single in-process cache entry, tracked for LRU eviction and
/// reporting, matching the teacher's general `CacheEntry` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub access_count: u64,
    pub last_accessed: DateTime<Utc>,
    pub size_bytes: usize,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: Vec<u8>, ttl: Option<chrono::Duration>) -> Self {
        let now = Utc::now();
        let size_bytes = value.len();
        Self {
            key: key.into(),
            value,
            created_at: now,
            expires_at: ttl.map(|d| now + d),
            access_count: 0,
            last_accessed: now,
            size_bytes,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(exp) if Utc::now() > exp)
    }

    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_relative_to_ttl() {
        let fresh = CacheEntry::new("k", vec![1, 2, 3], Some(chrono::Duration::seconds(60)));
        assert!(!fresh.is_expired());

        let stale = CacheEntry::new("k", vec![], Some(chrono::Duration::seconds(-1)));
        assert!(stale.is_expired());

        let forever = CacheEntry::new("k", vec![], None);
        assert!(!forever.is_expired());
    }
}
