//! In-memory weight cache.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use paycast_core::WeightSet;

/// A cached weight payload.
#[derive(Debug, Clone)]
pub struct CacheRecord {
    pub key: String,
    pub data: Arc<WeightSet>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheRecord {
    pub fn new(key: impl Into<String>, data: Arc<WeightSet>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            data,
            fetched_at,
        }
    }

    /// Milliseconds since the record was fetched.
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.fetched_at).num_milliseconds()
    }

    /// `true` while `now - fetched_at < ttl_ms`. A negative TTL is always expired.
    pub fn is_fresh(&self, ttl_ms: i64, now: DateTime<Utc>) -> bool {
        self.age_ms(now) < ttl_ms
    }
}

/// Key → record map shared by every load through one [`WeightLoader`](crate::WeightLoader).
///
/// No size bound and no eviction: records are only replaced on a successful
/// refresh or dropped by [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct WeightCache {
    records: RwLock<HashMap<String, CacheRecord>>,
}

impl WeightCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<CacheRecord> {
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get(key).cloned()
    }

    /// Insert or overwrite the record for `record.key`.
    pub fn put(&self, record: CacheRecord) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.insert(record.key.clone(), record);
    }

    pub fn clear(&self) {
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
