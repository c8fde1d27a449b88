use std::sync::Arc;

use tracing::{debug, info};

use crate::cell_ref::CellRef;
use crate::error::RemoteError;
use crate::rate_limit::RateLimiter;
use crate::retry::{RetryPolicy, with_retry};
use crate::transport::CellTransport;

/// One remote cell behind retry, backoff and (optionally) throttling.
///
/// This is the only way higher layers touch the remote store. It keeps no
/// state between calls other than the shared rate-limiter bucket.
#[derive(Clone)]
pub struct ResilientCell {
    transport: Arc<dyn CellTransport>,
    cell: CellRef,
    policy: RetryPolicy,
    limiter: Option<Arc<RateLimiter>>,
}

impl ResilientCell {
    pub fn new(transport: Arc<dyn CellTransport>, cell: CellRef, policy: RetryPolicy) -> Self {
        Self {
            transport,
            cell,
            policy,
            limiter: None,
        }
    }

    /// Throttle every attempt (including retries) through `limiter`.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn cell(&self) -> &CellRef {
        &self.cell
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Read the cell's full text.
    pub async fn read(&self) -> Result<String, RemoteError> {
        let label = format!("read {}", self.cell);
        let text = with_retry(&self.policy, &label, move || async move {
            self.throttle().await;
            self.transport.get_cell(&self.cell).await
        })
        .await?;
        debug!(
            backend = self.transport.name(),
            cell = %self.cell,
            bytes = text.len(),
            "cell read"
        );
        Ok(text)
    }

    /// Overwrite the cell's full text.
    pub async fn write(&self, text: &str) -> Result<(), RemoteError> {
        let label = format!("write {}", self.cell);
        with_retry(&self.policy, &label, move || async move {
            self.throttle().await;
            self.transport.set_cell(&self.cell, text).await
        })
        .await?;
        info!(
            backend = self.transport.name(),
            cell = %self.cell,
            bytes = text.len(),
            "cell written"
        );
        Ok(())
    }

    async fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }
    }
}

impl std::fmt::Debug for ResilientCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientCell")
            .field("backend", &self.transport.name())
            .field("cell", &self.cell)
            .field("policy", &self.policy)
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}
