//! Storage connectivity guard
//!
//! [`GuardedStore`] wraps any [`IndexStore`] with a bounded exponential
//! backoff around transient storage failures. A hard connection-refused
//! condition (`retryable: false`) is surfaced immediately and treated as
//! fatal by the process owner. [`bootstrap_kinds`] verifies the index and
//! alias for every configured kind at startup.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use warden_core::{Config, IndexStore, Result, SearchRequest, StorageSettings, VersionedDoc, WardenError};

use crate::mapping;

/// Backoff policy: starts at 10ms, doubles per attempt, capped at 8s, up to
/// a configured number of retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base: Duration::from_millis(10),
            cap: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            ..Default::default()
        }
    }

    fn should_retry(&self, error: &WardenError, attempt: u32) -> bool {
        matches!(
            error,
            WardenError::StorageUnavailable {
                retryable: true,
                ..
            }
        ) && attempt < self.max_retries
    }

    fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

/// Decorator applying the retry policy to every storage call.
pub struct GuardedStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S> GuardedStore<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

macro_rules! with_retry {
    ($self:ident, $call:expr) => {{
        let mut attempt = 0;
        loop {
            match $call.await {
                Err(error) if $self.policy.should_retry(&error, attempt) => {
                    debug!(attempt, %error, "transient storage failure, backing off");
                    tokio::time::sleep($self.policy.delay(attempt)).await;
                    attempt += 1;
                }
                other => break other,
            }
        }
    }};
}

#[async_trait]
impl<S: IndexStore> IndexStore for GuardedStore<S> {
    async fn ensure_kind(&self, kind: &str, mapping: &Value) -> Result<()> {
        with_retry!(self, self.inner.ensure_kind(kind, mapping))
    }

    async fn exists(&self, kind: &str, id: &str) -> Result<bool> {
        with_retry!(self, self.inner.exists(kind, id))
    }

    async fn get(&self, kind: &str, id: &str) -> Result<Option<VersionedDoc>> {
        with_retry!(self, self.inner.get(kind, id))
    }

    async fn put(
        &self,
        kind: &str,
        id: &str,
        source: Value,
        expected_version: Option<u64>,
    ) -> Result<u64> {
        with_retry!(self, self.inner.put(kind, id, source.clone(), expected_version))
    }

    async fn delete(&self, kind: &str, id: &str) -> Result<()> {
        with_retry!(self, self.inner.delete(kind, id))
    }

    async fn search(&self, kind: &str, request: SearchRequest) -> Result<Vec<VersionedDoc>> {
        with_retry!(self, self.inner.search(kind, request.clone()))
    }
}

/// Ensures index and alias exist for every configured resource kind.
pub async fn bootstrap_kinds(store: &dyn IndexStore, config: &Config) -> Result<()> {
    for kind in config.kinds() {
        let mapping = mapping::kind_mapping(&config.kind(kind));
        info!(kind, "ensuring index and alias");
        store.ensure_kind(kind, &mapping).await?;
    }
    Ok(())
}
