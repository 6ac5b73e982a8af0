//! Per-operation deadlines and retry
//!
//! [`RetryingStore`] decorates any [`IObjectStore`]. Every call runs under
//! `tokio::time::timeout`, so a hung request surfaces as
//! [`StoreError::Timeout`] instead of stalling the pass and every later
//! tick. Transient failures are retried with exponential backoff:
//! 200ms, 400ms, 800ms, ... capped at 10s.
//!
//! `AccessDenied`, `Body` and `PartialDelete` are returned immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use bucketsync_core::config::Config;
use bucketsync_core::domain::RemoteKey;
use bucketsync_core::ports::{IObjectStore, ObjectBody, ObjectEntry, StoreError};

/// Base delay for exponential backoff
pub const BASE_DELAY: Duration = Duration::from_millis(200);

/// Upper bound for a single backoff delay
pub const MAX_DELAY: Duration = Duration::from_secs(10);

/// Deadline and retry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub operation_timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(operation_timeout: Duration, max_retries: u32) -> Self {
        Self {
            operation_timeout,
            max_retries,
            base_delay: BASE_DELAY,
            max_delay: MAX_DELAY,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.operation_timeout, config.max_retries)
    }

    /// Delay before retry number `attempt + 1`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Object store decorator adding deadlines and retries
pub struct RetryingStore {
    inner: Arc<dyn IObjectStore>,
    policy: RetryPolicy,
}

impl RetryingStore {
    pub fn new(inner: Arc<dyn IObjectStore>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, key: &str, f: F) -> Result<T, StoreError>
    where
        F: Fn() -> Fut + Send,
        Fut: Future<Output = Result<T, StoreError>> + Send,
        T: Send,
    {
        let mut attempt = 0;

        loop {
            let result = match tokio::time::timeout(self.policy.operation_timeout, f()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(self.policy.operation_timeout)),
            };

            match result {
                Ok(value) => {
                    if attempt > 0 {
                        info!(operation, key, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        operation,
                        key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait::async_trait]
impl IObjectStore for RetryingStore {
    async fn exists(&self, bucket: &str, key: &RemoteKey) -> Result<bool, StoreError> {
        self.call("exists", key.as_str(), || self.inner.exists(bucket, key))
            .await
    }

    async fn put(&self, bucket: &str, key: &RemoteKey, body: ObjectBody) -> Result<(), StoreError> {
        self.call("put", key.as_str(), || self.inner.put(bucket, key, body.clone()))
            .await
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectEntry>, StoreError> {
        self.call("list", prefix, || self.inner.list(bucket, prefix))
            .await
    }

    async fn delete_batch(&self, bucket: &str, keys: &[RemoteKey]) -> Result<(), StoreError> {
        let label = format!("{} key(s)", keys.len());
        self.call("delete_batch", &label, || self.inner.delete_batch(bucket, keys))
            .await
    }
}
