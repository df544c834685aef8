//! Infrastructure layer: configuration and the asynchronous job queue.

pub mod config;
pub mod jobs;

pub use config::{ConfigError, PaycastConfig};
pub use jobs::{
    InMemoryWebhookNotifier, Job, JobOptions, JobQueue, JobQueueConfig, JobReceipt, JobStatus,
    LogWebhookNotifier, WebhookNotifier, WebhookPayload,
};
