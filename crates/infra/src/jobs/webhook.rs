//! Webhook notification for finished jobs.
//!
//! The transport is a collaborator: the queue only hands a payload and a URL to
//! a [`WebhookNotifier`]. Delivery failures are reported back but never change
//! the job record.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::info;

use paycast_predictor::PredictionResult;

use super::types::{Job, JobId, JobStatus};

/// Body delivered to a job's webhook URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<PredictionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WebhookPayload {
    /// Payload for a job in a terminal state.
    pub fn for_job(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            result: job.result.clone(),
            error: job.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook delivery to {url} failed: {reason}")]
    Delivery { url: String, reason: String },
}

/// Outbound webhook transport.
pub trait WebhookNotifier: Send + Sync + 'static {
    fn deliver(&self, url: &str, payload: &WebhookPayload) -> Result<(), WebhookError>;
}

/// Records deliveries in memory, for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryWebhookNotifier {
    inner: Mutex<Vec<(String, WebhookPayload)>>,
    failing: AtomicBool,
}

impl InMemoryWebhookNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that records every attempt and then reports failure.
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.failing.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn all(&self) -> Vec<(String, WebhookPayload)> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl WebhookNotifier for InMemoryWebhookNotifier {
    fn deliver(&self, url: &str, payload: &WebhookPayload) -> Result<(), WebhookError> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((url.to_string(), payload.clone()));

        if self.failing.load(Ordering::SeqCst) {
            return Err(WebhookError::Delivery {
                url: url.to_string(),
                reason: "endpoint unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Logs each notification instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWebhookNotifier;

impl WebhookNotifier for LogWebhookNotifier {
    fn deliver(&self, url: &str, payload: &WebhookPayload) -> Result<(), WebhookError> {
        info!(
            url = %url,
            job_id = %payload.job_id,
            status = %payload.status,
            "webhook notification"
        );
        Ok(())
    }
}
