use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use paycast_core::{DataOrigin, DomainError, WeightMeta};

/// Output of a single salary prediction.
///
/// Created fresh per call and never mutated afterwards. Serialises camelCase,
/// which is the shape the HTTP layer and webhook payloads expose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub estimated_salary: i64,
    pub salary_range: SalaryRange,
    pub currency: String,
    pub region: String,
    pub experience_years: f64,
    pub breakdown: Breakdown,
    pub skills: SkillSummary,
    /// Labels of every combo that applied, e.g. `react+typescript+nodejs`.
    pub active_combos: Vec<String>,
    /// Heuristic in \[0, 100\].
    pub confidence: u8,
    pub execution_time_ms: f64,
    pub timestamp: DateTime<Utc>,
    /// Which weight set produced this result.
    pub data_source: WeightMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: i64,
    pub max: i64,
}

/// Multipliers behind an estimate, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub base_salary: f64,
    pub skill_multiplier: f64,
    pub experience_multiplier: f64,
    pub combo_bonus: f64,
    pub senior_bonus: f64,
    pub final_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSummary {
    /// Normalised keys found in the skill table, in input order.
    pub matched: Vec<String>,
    /// Normalised keys with no weight; ignored by the formula.
    pub unmatched: Vec<String>,
    /// Length of the input list, blanks and repeats included.
    pub total: usize,
}

/// Binding state of a predictor's weight data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataStatus {
    /// Built-in tables, no live source configured.
    Static,
    /// A live source is configured but not resolved yet; sync prediction refuses to run.
    StaticPendingLive,
    Live,
    /// Live source failed; a previously cached payload is in use.
    StaleLive,
    /// Live source failed with nothing cached; built-in tables are in use.
    StaticFallback,
}

/// Snapshot of where a predictor's weights currently come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataInfo {
    pub status: DataStatus,
    pub source: DataOrigin,
    pub stale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
    /// Last load failure, if the live source misbehaved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictorError {
    #[error("weight data not ready: live source is still pending (use predict_async)")]
    DataNotReady,

    #[error(transparent)]
    InvalidInput(#[from] DomainError),
}
