//! `paycast-core`: weight data and shared error model.
//!
//! This crate holds the **pure** building blocks of salary estimation: the
//! weight tables, skill normalisation, and domain errors. No I/O.

pub mod error;
pub mod tables;
pub mod weights;

pub use error::{DomainError, DomainResult};
pub use tables::static_weights;
pub use weights::{
    ComboRule, DataOrigin, ExperienceCurve, FALLBACK_REGION, SENIOR_THRESHOLD_YEARS, WeightMeta,
    WeightSet, normalize_skill,
};
