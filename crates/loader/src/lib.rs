//! `paycast-loader`
//!
//! **Responsibility:** fetch alternate weight data from an external source,
//! cache it with a TTL, and fall back to stale data when a refresh fails.
//!
//! - Sources are pluggable ([`WeightSource`]); [`HttpWeightSource`] is the stock one.
//! - The cache is an owned object ([`WeightCache`]), never ambient process state.
//! - Concurrent loads for the same key are not coalesced; each caller may hit
//!   the source independently once the cached record is stale.

pub mod cache;
pub mod error;
pub mod loader;
pub mod source;

pub use cache::{CacheRecord, WeightCache};
pub use error::LoadError;
pub use loader::{
    LoadOptions, LoadOutcome, REQUIRED_KEYS, WarningHook, WeightLoader, parse_weight_set,
    validate_payload,
};
pub use source::{FnSource, HttpSourceConfig, HttpWeightSource, Transform, WeightSource, source_fn};
