//! Core job types and lifecycle.

use std::borrow::Borrow;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paycast_core::FALLBACK_REGION;
use paycast_predictor::{PredictionResult, PredictorConfig};

/// Unique job identifier: `job_<unix millis>_<process-wide counter>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
        Self(format!("job_{}_{}", Utc::now().timestamp_millis(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Job execution status.
///
/// `Pending → Processing → Completed | Failed`; terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, waiting for the worker
    Pending,
    /// Prediction running
    Processing,
    /// Prediction stored in `result`
    Completed,
    /// Error message stored in `error`
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-job prediction settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    /// Defaults to `US`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Defaults to `0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<f64>,
    /// Notified once the job reaches a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl JobOptions {
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_experience(mut self, years: f64) -> Self {
        self.experience_years = Some(years);
        self
    }

    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    pub fn predictor_config(&self) -> PredictorConfig {
        PredictorConfig::new(
            self.region.clone().unwrap_or_else(|| FALLBACK_REGION.to_string()),
            self.experience_years.unwrap_or(0.0),
        )
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
}

/// An asynchronous prediction job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub skills: Vec<String>,
    pub options: JobOptions,
    pub created_at: DateTime<Utc>,
    /// Stamped on entering a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<PredictionResult>,
    pub error: Option<String>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(skills: Vec<String>, options: JobOptions) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Pending,
            skills,
            options,
            created_at: Utc::now(),
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Mark job as picked up by the worker.
    pub fn mark_processing(&mut self) -> Result<(), JobError> {
        self.transition(JobStatus::Pending, JobStatus::Processing)
    }

    /// Mark job as completed.
    pub fn mark_completed(&mut self, result: PredictionResult) -> Result<(), JobError> {
        self.transition(JobStatus::Processing, JobStatus::Completed)?;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Mark job as failed.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), JobError> {
        self.transition(JobStatus::Processing, JobStatus::Failed)?;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Terminal and finished strictly before `cutoff`.
    pub fn finished_before(&self, cutoff: DateTime<Utc>) -> bool {
        self.status.is_terminal() && self.completed_at.is_some_and(|at| at < cutoff)
    }

    fn transition(&mut self, expected: JobStatus, next: JobStatus) -> Result<(), JobError> {
        if self.status != expected {
            return Err(JobError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// What `schedule_job` hands back immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReceipt {
    pub job_id: JobId,
    pub status: JobStatus,
}
