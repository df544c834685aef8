use std::sync::{Arc, Mutex};

use paycast_loader::{LoadError, LoadOptions, LoadOutcome, WeightLoader, WeightSource};

/// A live weight source bound to a loader and its load policy.
#[derive(Clone)]
pub struct LiveDataSource {
    loader: WeightLoader,
    source: Arc<dyn WeightSource>,
    options: LoadOptions,
}

impl LiveDataSource {
    pub fn new(loader: WeightLoader, source: Arc<dyn WeightSource>, options: LoadOptions) -> Self {
        Self {
            loader,
            source,
            options,
        }
    }

    /// Load through the cache.
    ///
    /// On a stale fallback the refresh failure is returned alongside the outcome.
    pub async fn load(&self) -> Result<(LoadOutcome, Option<LoadError>), LoadError> {
        let warning = Mutex::new(None);
        let hook = |err: &LoadError| {
            *warning.lock().unwrap_or_else(|e| e.into_inner()) = Some(err.clone());
        };

        let outcome = self
            .loader
            .load(self.source.as_ref(), &self.options, Some(&hook))
            .await?;

        let warning = warning.into_inner().unwrap_or_else(|e| e.into_inner());
        Ok((outcome, warning))
    }
}

impl std::fmt::Debug for LiveDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveDataSource")
            .field("source", &self.source.fingerprint())
            .field("options", &self.options)
            .finish()
    }
}
