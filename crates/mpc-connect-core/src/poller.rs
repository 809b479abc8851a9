//! Remote operation polling
//!
//! Drives a submitted operation until it is ready to co-sign or completed.
//! Polling stops on the first of:
//!
//! - the target status is observed
//! - a `failed` status is observed → `OperationFailed`
//! - the deadline or poll budget is exhausted → `OperationTimedOut`
//! - the caller cancels → `Cancelled`
//! - a gateway call fails → that error, unchanged
//!
//! `unknown` and other intermediate statuses keep the loop going. Stopping a
//! wait never cancels the operation on the provider side.

use crate::config::PollPolicy;
use crate::gateway::NetworkGateway;
use crate::lifecycle::TokenLifecycleManager;
use crate::operation::{OperationHandle, OperationRequest, OperationStatus, RemoteOperation};
use crate::{Error, Result, Signature, TxHash};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Cooperative cancellation for an operation wait
///
/// Clones share the same flag. Once cancelled, waits observing it return
/// [`Error::Cancelled`] and issue no further polls.
#[derive(Debug, Clone)]
pub struct PollCancellation {
    flag: Arc<watch::Sender<bool>>,
}

impl PollCancellation {
    /// Create an untriggered cancellation
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    /// Stop every wait observing this cancellation
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    /// Whether `cancel` was called
    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.flag.subscribe()
    }
}

impl Default for PollCancellation {
    fn default() -> Self {
        Self::new()
    }
}

async fn cancelled(signal: Option<&mut watch::Receiver<bool>>) {
    match signal {
        Some(rx) => {
            if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await
            }
        }
        None => std::future::pending::<()>().await,
    }
}

/// What a wait is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    /// `pending_signature`; a `completed` status also ends the wait since
    /// the ready state can no longer be observed
    Ready,
    /// `completed`
    Completed,
}

impl WaitTarget {
    fn is_reached_by(&self, status: OperationStatus) -> bool {
        match self {
            WaitTarget::Ready => status.is_ready() || status == OperationStatus::Completed,
            WaitTarget::Completed => status == OperationStatus::Completed,
        }
    }
}

/// Submits remote operations and polls them to the caller's target status
pub struct RemoteOperationPoller {
    gateway: Arc<dyn NetworkGateway>,
    tokens: Arc<TokenLifecycleManager>,
    policy: PollPolicy,
}

impl RemoteOperationPoller {
    /// Create a poller
    pub fn new(
        gateway: Arc<dyn NetworkGateway>,
        tokens: Arc<TokenLifecycleManager>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            gateway,
            tokens,
            policy,
        }
    }

    /// The polling policy in use
    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Submit `request` once and wait until the operation is ready to co-sign
    #[instrument(skip(self, request, cancel), fields(kind = request.kind(), key = %request.idempotency_key()))]
    pub async fn submit_and_await_ready(
        &self,
        device_id: &str,
        request: &OperationRequest,
        cancel: Option<&PollCancellation>,
    ) -> Result<OperationHandle> {
        let token = self.tokens.resolve_access_token(device_id).await?;
        let submitted = match request {
            OperationRequest::SignMessage(r) => {
                self.gateway.submit_message_signing(&token, r).await?
            }
            OperationRequest::Transfer(r) => self.gateway.submit_asset_transfer(&token, r).await?,
        };
        info!(operation_id = %submitted.id, status = %submitted.status, "Operation submitted");

        let status = submitted.status;
        let operation = match status {
            OperationStatus::Failed => return Err(failure(&submitted)),
            status if WaitTarget::Ready.is_reached_by(status) => submitted,
            _ => {
                self.wait_for(device_id, &submitted.id, WaitTarget::Ready, cancel)
                    .await?
            }
        };

        Ok(OperationHandle {
            operation_id: operation.id.clone(),
            idempotency_key: request.idempotency_key(),
            operation,
        })
    }

    /// Wait until an existing operation is ready to co-sign
    pub async fn await_ready(
        &self,
        device_id: &str,
        operation_id: &str,
        cancel: Option<&PollCancellation>,
    ) -> Result<RemoteOperation> {
        self.wait_for(device_id, operation_id, WaitTarget::Ready, cancel)
            .await
    }

    /// Wait until an operation completes
    pub async fn await_completion(
        &self,
        device_id: &str,
        operation_id: &str,
        cancel: Option<&PollCancellation>,
    ) -> Result<RemoteOperation> {
        self.wait_for(device_id, operation_id, WaitTarget::Completed, cancel)
            .await
    }

    /// Wait until a signing operation completes and return its signature
    ///
    /// Resolves on `completed`, not on `pending_signature`: the signature only
    /// exists once the device has co-signed. Use [`Self::await_ready`] to wait
    /// for the co-signing step.
    pub async fn await_signature(
        &self,
        device_id: &str,
        operation_id: &str,
        cancel: Option<&PollCancellation>,
    ) -> Result<Signature> {
        let operation = self.await_completion(device_id, operation_id, cancel).await?;
        signature_of(&operation)
    }

    /// Wait until a transfer completes and return its transaction hash
    pub async fn await_tx_hash(
        &self,
        device_id: &str,
        operation_id: &str,
        cancel: Option<&PollCancellation>,
    ) -> Result<TxHash> {
        let operation = self.await_completion(device_id, operation_id, cancel).await?;
        tx_hash_of(&operation)
    }

    #[instrument(skip(self, cancel))]
    async fn wait_for(
        &self,
        device_id: &str,
        operation_id: &str,
        target: WaitTarget,
        cancel: Option<&PollCancellation>,
    ) -> Result<RemoteOperation> {
        let timeout_ms = match target {
            WaitTarget::Ready => self.policy.ready_timeout_ms,
            WaitTarget::Completed => self.policy.completion_timeout_ms,
        };
        let started = Instant::now();
        let deadline = started + std::time::Duration::from_millis(timeout_ms);
        let mut signal = cancel.map(PollCancellation::subscribe);
        let mut polls: u32 = 0;

        let timed_out = |started: Instant| Error::OperationTimedOut {
            operation_id: operation_id.to_string(),
            waited_ms: started.elapsed().as_millis() as u64,
        };

        loop {
            if signal.as_ref().is_some_and(|rx| *rx.borrow()) {
                debug!(polls, "Wait cancelled");
                return Err(Error::Cancelled(operation_id.to_string()));
            }
            if polls > 0 && Instant::now() >= deadline {
                warn!(polls, "Operation deadline exceeded");
                return Err(timed_out(started));
            }

            // Resolved per poll so long waits survive an access token expiry.
            let token = self.tokens.resolve_access_token(device_id).await?;
            let operation = self.gateway.poll_operation(&token, operation_id).await?;
            polls += 1;
            debug!(polls, status = %operation.status, "Polled operation");

            if operation.status == OperationStatus::Failed {
                return Err(failure(&operation));
            }
            if target.is_reached_by(operation.status) {
                return Ok(operation);
            }

            if self.policy.max_polls.is_some_and(|max| polls >= max) {
                warn!(polls, "Operation poll budget exhausted");
                return Err(timed_out(started));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let delay = self.policy.interval_after(polls - 1).min(remaining);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancelled(signal.as_mut()) => {
                    debug!(polls, "Wait cancelled");
                    return Err(Error::Cancelled(operation_id.to_string()));
                }
            }
        }
    }
}

fn failure(operation: &RemoteOperation) -> Error {
    Error::OperationFailed {
        operation_id: operation.id.clone(),
        reason: operation
            .failure_reason
            .clone()
            .unwrap_or_else(|| operation.status.to_string()),
    }
}

/// Extract the signature of a completed signing operation
pub fn signature_of(operation: &RemoteOperation) -> Result<Signature> {
    operation
        .result
        .as_ref()
        .and_then(|r| r.signature.as_deref())
        .ok_or_else(|| Error::MissingOperationResult(operation.id.clone()))
        .and_then(Signature::from_hex)
}

/// Extract the transaction hash of a completed transfer
pub fn tx_hash_of(operation: &RemoteOperation) -> Result<TxHash> {
    operation
        .result
        .as_ref()
        .and_then(|r| r.tx_hash.clone())
        .map(TxHash)
        .ok_or_else(|| Error::MissingOperationResult(operation.id.clone()))
}
