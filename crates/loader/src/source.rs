//! Weight data sources.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::LoadError;

/// An argument-less operation producing a weight payload.
///
/// The payload is raw JSON; shape validation happens in the loader.
#[async_trait]
pub trait WeightSource: Send + Sync {
    async fn fetch(&self) -> Result<JsonValue, LoadError>;

    /// Stable identity used to derive a cache key when none is given.
    fn fingerprint(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

/// A [`WeightSource`] backed by a closure.
pub struct FnSource<F> {
    name: String,
    fetch: F,
}

/// Wrap a closure returning a future as a named source.
pub fn source_fn<F, Fut>(name: impl Into<String>, fetch: F) -> FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<JsonValue, LoadError>> + Send + 'static,
{
    FnSource {
        name: name.into(),
        fetch,
    }
}

#[async_trait]
impl<F, Fut> WeightSource for FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<JsonValue, LoadError>> + Send + 'static,
{
    async fn fetch(&self) -> Result<JsonValue, LoadError> {
        (self.fetch)().await
    }

    fn fingerprint(&self) -> String {
        format!("fn:{}", self.name)
    }
}

/// Reshapes a response body before validation.
pub type Transform = Arc<dyn Fn(JsonValue) -> Result<JsonValue, LoadError> + Send + Sync>;

/// Settings for [`HttpWeightSource`].
#[derive(Clone)]
pub struct HttpSourceConfig {
    pub url: String,
    /// Sent as a bearer token when present.
    pub token: Option<String>,
    pub headers: Vec<(String, String)>,
    pub timeout_ms: u64,
    pub transform: Option<Transform>,
}

impl HttpSourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            headers: Vec::new(),
            timeout_ms: 5_000,
            transform: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(JsonValue) -> Result<JsonValue, LoadError> + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }
}

impl std::fmt::Debug for HttpSourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSourceConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("headers", &self.headers)
            .field("timeout_ms", &self.timeout_ms)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// GETs a JSON weight payload over HTTP.
#[derive(Debug, Clone)]
pub struct HttpWeightSource {
    client: reqwest::Client,
    config: HttpSourceConfig,
}

impl HttpWeightSource {
    pub fn new(config: HttpSourceConfig) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| LoadError::Http(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl WeightSource for HttpWeightSource {
    async fn fetch(&self) -> Result<JsonValue, LoadError> {
        let mut request = self.client.get(&self.config.url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| LoadError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Http(format!(
                "GET {} returned {status}",
                self.config.url
            )));
        }

        let body: JsonValue = response
            .json()
            .await
            .map_err(|e| LoadError::invalid(format!("response body is not JSON: {e}")))?;

        debug!(url = %self.config.url, "fetched weight payload");

        match &self.config.transform {
            Some(transform) => transform(body),
            None => Ok(body),
        }
    }

    fn fingerprint(&self) -> String {
        format!("http:{}", self.config.url)
    }
}
