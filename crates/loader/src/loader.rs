//! TTL-cached loading with stale fallback.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use paycast_core::{DataOrigin, WeightMeta, WeightSet};

use crate::cache::{CacheRecord, WeightCache};
use crate::error::LoadError;
use crate::source::WeightSource;

/// Top-level keys every weight payload must carry (values may be empty).
pub const REQUIRED_KEYS: [&str; 5] =
    ["baseSalaries", "skills", "experience", "combos", "currencies"];

/// Check the payload shape: a JSON object containing all of [`REQUIRED_KEYS`].
pub fn validate_payload(payload: &JsonValue) -> Result<(), LoadError> {
    let object = payload
        .as_object()
        .ok_or_else(|| LoadError::invalid("expected a JSON object"))?;

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| !object.contains_key(*key))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoadError::invalid(format!(
            "missing required keys: {}",
            missing.join(", ")
        )))
    }
}

/// Validate, decode and invariant-check a payload.
///
/// Nothing is partially applied: any failure rejects the whole payload.
pub fn parse_weight_set(payload: JsonValue) -> Result<WeightSet, LoadError> {
    validate_payload(&payload)?;

    let weights: WeightSet =
        serde_json::from_value(payload).map_err(|e| LoadError::invalid(e.to_string()))?;
    weights
        .check_invariants()
        .map_err(|e| LoadError::invalid(e.to_string()))?;

    Ok(weights)
}

/// Per-call load policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Explicit cache key; derived from the source fingerprint when `None`.
    pub cache_key: Option<String>,
    /// Records younger than this are served without calling the source.
    pub ttl_ms: i64,
    pub timeout_ms: u64,
    /// Serve the previous record when a refresh fails.
    pub allow_stale: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            cache_key: None,
            ttl_ms: 5 * 60 * 1_000,
            timeout_ms: 5_000,
            allow_stale: true,
        }
    }
}

impl LoadOptions {
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn with_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_allow_stale(mut self, allow_stale: bool) -> Self {
        self.allow_stale = allow_stale;
        self
    }
}

/// Result of a successful [`WeightLoader::load`].
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// Weights with `meta` describing this outcome.
    pub data: Arc<WeightSet>,
    pub source: DataOrigin,
    pub stale: bool,
    pub fetched_at: DateTime<Utc>,
}

impl LoadOutcome {
    fn from_record(record: &CacheRecord, source: DataOrigin, stale: bool) -> Self {
        let meta = WeightMeta::loaded(source, stale, record.fetched_at);
        Self {
            data: Arc::new(record.data.as_ref().clone().with_meta(meta)),
            source,
            stale,
            fetched_at: record.fetched_at,
        }
    }
}

/// Callback told why a refresh failed when stale data is served instead.
pub type WarningHook<'a> = &'a (dyn Fn(&LoadError) + Send + Sync);

/// Loads weight data through an owned [`WeightCache`].
#[derive(Debug, Clone, Default)]
pub struct WeightLoader {
    cache: Arc<WeightCache>,
}

impl WeightLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &Arc<WeightCache> {
        &self.cache
    }

    /// Cache key for `source` under `options`.
    pub fn cache_key(source: &dyn WeightSource, options: &LoadOptions) -> String {
        match &options.cache_key {
            Some(key) => key.clone(),
            None => {
                let mut hasher = DefaultHasher::new();
                source.fingerprint().hash(&mut hasher);
                format!("weights:{:016x}", hasher.finish())
            }
        }
    }

    /// Return fresh cached data, or refresh from `source` with fallback.
    ///
    /// - Fresh record (`age < ttl`): served as [`DataOrigin::Cache`], source untouched.
    /// - Otherwise exactly one fetch, raced against `timeout_ms`.
    /// - Valid payload: replaces the record, served as [`DataOrigin::Live`].
    /// - Failure with a record and `allow_stale`: served as [`DataOrigin::StaleCache`]
    ///   after `on_warning` is told why. Otherwise the failure is returned.
    pub async fn load(
        &self,
        source: &dyn WeightSource,
        options: &LoadOptions,
        on_warning: Option<WarningHook<'_>>,
    ) -> Result<LoadOutcome, LoadError> {
        let key = Self::cache_key(source, options);
        let cached = self.cache.get(&key);

        if let Some(record) = &cached {
            if record.is_fresh(options.ttl_ms, Utc::now()) {
                debug!(key = %key, age_ms = record.age_ms(Utc::now()), "weight cache hit");
                return Ok(LoadOutcome::from_record(record, DataOrigin::Cache, false));
            }
        }

        match self.refresh(source, &key, options.timeout_ms).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => match cached {
                Some(record) if options.allow_stale => {
                    warn!(
                        key = %key,
                        error = %err,
                        fetched_at = %record.fetched_at,
                        "weight refresh failed; serving stale cache"
                    );
                    if let Some(hook) = on_warning {
                        hook(&err);
                    }
                    Ok(LoadOutcome::from_record(&record, DataOrigin::StaleCache, true))
                }
                _ => {
                    warn!(key = %key, error = %err, "weight refresh failed");
                    Err(err)
                }
            },
        }
    }

    async fn refresh(
        &self,
        source: &dyn WeightSource,
        key: &str,
        timeout_ms: u64,
    ) -> Result<LoadOutcome, LoadError> {
        let payload = tokio::time::timeout(Duration::from_millis(timeout_ms), source.fetch())
            .await
            .map_err(|_| LoadError::Timeout(timeout_ms))??;

        let weights = parse_weight_set(payload)?;
        let fetched_at = Utc::now();
        let meta = WeightMeta::loaded(DataOrigin::Live, false, fetched_at);
        let data = Arc::new(weights.with_meta(meta));

        self.cache.put(CacheRecord::new(key, data.clone(), fetched_at));
        info!(key = %key, skills = data.skills.len(), "loaded live weight data");

        Ok(LoadOutcome {
            data,
            source: DataOrigin::Live,
            stale: false,
            fetched_at,
        })
    }
}
