//! In-memory prediction job queue.
//!
//! ## Design
//!
//! - Jobs move `pending → processing → completed | failed`; terminal states are final
//! - A single worker thread runs jobs in submission order
//! - Finished jobs notify their webhook exactly once, outside the store lock
//! - Finished jobs are swept after a retention period
//!
//! ## Components
//!
//! - `Job`: job record and lifecycle transitions
//! - `InMemoryJobStore`: lock-guarded job records
//! - `JobQueue`: scheduling API plus the worker thread
//! - `WebhookNotifier`: outbound notification transport

pub mod queue;
pub mod store;
pub mod types;
pub mod webhook;

pub use queue::{JobQueue, JobQueueConfig, JobQueueError};
pub use store::{InMemoryJobStore, JobStats};
pub use types::{Job, JobError, JobId, JobOptions, JobReceipt, JobStatus};
pub use webhook::{
    InMemoryWebhookNotifier, LogWebhookNotifier, WebhookError, WebhookNotifier, WebhookPayload,
};
