//! Asynchronous prediction queue.
//!
//! One dedicated worker thread consumes an `mpsc` channel, so jobs run in
//! submission order off the caller's path. The same thread sweeps finished jobs
//! on a fixed cadence.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use paycast_predictor::{PredictionResult, Predictor};

use super::store::{InMemoryJobStore, JobStats};
use super::types::{Job, JobId, JobOptions, JobReceipt, JobStatus};
use super::webhook::{WebhookNotifier, WebhookPayload};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct JobQueueConfig {
    /// Worker thread name, also used in logs
    pub name: String,
    /// How long finished jobs are kept by the periodic sweep
    pub retention: Duration,
    /// How often the worker runs the sweep; zero turns the periodic sweep off
    pub cleanup_interval: Duration,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            name: "prediction-queue".to_string(),
            retention: Duration::from_secs(60 * 60),
            cleanup_interval: Duration::from_secs(10 * 60),
        }
    }
}

impl JobQueueConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobQueueError {
    #[error("job queue worker has stopped")]
    WorkerStopped,
    #[error("failed to start job queue worker: {0}")]
    Spawn(String),
}

enum Message {
    Run(JobId),
    Shutdown,
}

/// Handle to the prediction queue and its worker.
pub struct JobQueue {
    store: Arc<InMemoryJobStore>,
    sender: mpsc::Sender<Message>,
    join: Option<thread::JoinHandle<()>>,
    name: String,
}

impl JobQueue {
    /// Start the worker thread.
    pub fn spawn(
        config: JobQueueConfig,
        notifier: Arc<dyn WebhookNotifier>,
    ) -> Result<Self, JobQueueError> {
        let store = InMemoryJobStore::arc();
        let (sender, receiver) = mpsc::channel::<Message>();

        let name = config.name.clone();
        let worker_store = store.clone();
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(config, receiver, worker_store, notifier))
            .map_err(|e| JobQueueError::Spawn(e.to_string()))?;

        Ok(Self {
            store,
            sender,
            join: Some(join),
            name,
        })
    }

    /// Store a pending job and hand it to the worker.
    pub fn schedule_job<S: AsRef<str>>(
        &self,
        skills: &[S],
        options: JobOptions,
    ) -> Result<JobReceipt, JobQueueError> {
        let skills = skills.iter().map(|s| s.as_ref().to_string()).collect();
        let job = Job::new(skills, options);
        let id = job.id.clone();
        self.store.insert(job);

        if self.sender.send(Message::Run(id.clone())).is_err() {
            // Never reachable by the worker; don't leave it pending forever.
            let _ = self.store.transition(&id, |job| {
                job.mark_processing()?;
                job.mark_failed(JobQueueError::WorkerStopped.to_string())
            });
            return Err(JobQueueError::WorkerStopped);
        }

        debug!(queue = %self.name, job_id = %id, "job scheduled");
        Ok(JobReceipt {
            job_id: id,
            status: JobStatus::Pending,
        })
    }

    pub fn get_job(&self, id: &str) -> Option<Job> {
        self.store.get(id)
    }

    /// Remove finished jobs completed more than `older_than` ago.
    pub fn cleanup(&self, older_than: Duration) -> usize {
        sweep(&self.store, older_than)
    }

    pub fn stats(&self) -> JobStats {
        self.store.stats()
    }

    /// Stop the worker after the jobs already queued have run.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.sender.send(Message::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("name", &self.name)
            .field("jobs", &self.store.len())
            .finish()
    }
}

fn sweep(store: &InMemoryJobStore, older_than: Duration) -> usize {
    let Ok(age) = chrono::Duration::from_std(older_than) else {
        return 0;
    };
    let Some(cutoff) = Utc::now().checked_sub_signed(age) else {
        return 0;
    };
    store.remove_completed_before(cutoff)
}

fn worker_loop(
    config: JobQueueConfig,
    receiver: mpsc::Receiver<Message>,
    store: Arc<InMemoryJobStore>,
    notifier: Arc<dyn WebhookNotifier>,
) {
    info!(queue = %config.name, "job queue worker started");
    let periodic = !config.cleanup_interval.is_zero();
    let mut next_sweep = Instant::now() + config.cleanup_interval;

    loop {
        let message = if periodic {
            let wait = next_sweep.saturating_duration_since(Instant::now());
            match receiver.recv_timeout(wait) {
                Ok(message) => Some(message),
                Err(mpsc::RecvTimeoutError::Timeout) => None,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match receiver.recv() {
                Ok(message) => Some(message),
                Err(mpsc::RecvError) => break,
            }
        };

        match message {
            Some(Message::Run(id)) => process(&config.name, &store, notifier.as_ref(), &id),
            Some(Message::Shutdown) => break,
            None => {}
        }

        if periodic && Instant::now() >= next_sweep {
            let removed = sweep(&store, config.retention);
            if removed > 0 {
                info!(queue = %config.name, removed, "swept finished jobs");
            }
            next_sweep = Instant::now() + config.cleanup_interval;
        }
    }

    info!(queue = %config.name, "job queue worker stopped");
}

fn process(queue: &str, store: &InMemoryJobStore, notifier: &dyn WebhookNotifier, id: &JobId) {
    let job = match store.transition(id, |job| job.mark_processing()) {
        Ok(job) => job,
        Err(e) => {
            error!(queue = %queue, job_id = %id, error = %e, "cannot start job");
            return;
        }
    };

    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_prediction(&job)))
        .unwrap_or_else(|payload| Err(panic_message("prediction", payload.as_ref())));

    let finished = store.transition(id, |job| match outcome {
        Ok(result) => job.mark_completed(result),
        Err(message) => job.mark_failed(message),
    });

    let job = match finished {
        Ok(job) => job,
        Err(e) => {
            error!(queue = %queue, job_id = %id, error = %e, "cannot finish job");
            return;
        }
    };

    match job.status {
        JobStatus::Completed => debug!(
            queue = %queue,
            job_id = %id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "job completed"
        ),
        _ => warn!(
            queue = %queue,
            job_id = %id,
            error = job.error.as_deref().unwrap_or_default(),
            "job failed"
        ),
    }

    if let Some(url) = job.options.webhook_url.as_deref() {
        let payload = WebhookPayload::for_job(&job);
        let delivered = panic::catch_unwind(AssertUnwindSafe(|| notifier.deliver(url, &payload)));
        match delivered {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(queue = %queue, job_id = %id, error = %e, "webhook delivery failed")
            }
            Err(panicked) => warn!(
                queue = %queue,
                job_id = %id,
                error = %panic_message("webhook notifier", panicked.as_ref()),
                "webhook delivery failed"
            ),
        }
    }
}

fn run_prediction(job: &Job) -> Result<PredictionResult, String> {
    let predictor = Predictor::new(job.options.predictor_config()).map_err(|e| e.to_string())?;
    predictor.predict(&job.skills).map_err(|e| e.to_string())
}

fn panic_message(what: &str, payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("{what} panicked: {detail}")
}
