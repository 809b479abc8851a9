//! Remote operations
//!
//! Signing and transfer requests run asynchronously on the provider. Each
//! submission returns a [`RemoteOperation`] whose status is polled until the
//! caller's target is reached.
//!
//! ```text
//! queued ──► pending_signature | signature_required ──► completed
//!    │                  (unknown may appear at any point)
//!    └──────────────────────────► failed
//! ```

use crate::types::{AccountId, AssetId, MessageEncoding, OperationId};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Status of a remote operation, decoded from the provider's status string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Accepted, waiting for the provider
    Queued,
    /// Ready for the device to co-sign
    PendingSignature,
    /// Provider is collecting signatures
    SignatureRequired,
    /// Finished, result available
    Completed,
    /// Rejected, cancelled or failed remotely
    Failed,
    /// Status string not recognised; treated as still in progress
    Unknown,
}

impl OperationStatus {
    /// Decode a provider status string; unrecognised values map to `Unknown`
    pub fn parse(value: &str) -> Self {
        let normalized: String = value
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "queued" | "submitted" => OperationStatus::Queued,
            "pendingsignature" => OperationStatus::PendingSignature,
            "signaturerequired" => OperationStatus::SignatureRequired,
            "completed" => OperationStatus::Completed,
            "failed" | "rejected" | "cancelled" | "canceled" | "blocked" => {
                OperationStatus::Failed
            }
            _ => OperationStatus::Unknown,
        }
    }

    /// The device can co-sign now
    pub fn is_ready(&self) -> bool {
        matches!(self, OperationStatus::PendingSignature)
    }

    /// No further status change will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Completed | OperationStatus::Failed)
    }
}

impl<'de> Deserialize<'de> for OperationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(OperationStatus::parse(&value))
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStatus::Queued => write!(f, "queued"),
            OperationStatus::PendingSignature => write!(f, "pending_signature"),
            OperationStatus::SignatureRequired => write!(f, "signature_required"),
            OperationStatus::Completed => write!(f, "completed"),
            OperationStatus::Failed => write!(f, "failed"),
            OperationStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result data attached to a completed operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Hex signature (message signing)
    #[serde(default)]
    pub signature: Option<String>,
    /// Transaction hash (transfers)
    #[serde(default)]
    pub tx_hash: Option<String>,
}

/// Snapshot of a remote operation as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOperation {
    /// Operation identifier
    pub id: OperationId,
    /// Current status
    pub status: OperationStatus,
    /// Provider transaction the device co-signs
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Result, once completed
    #[serde(default)]
    pub result: Option<OperationResult>,
    /// Reason reported with a failure status
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl RemoteOperation {
    /// Create an operation snapshot with the given status
    pub fn new(id: impl Into<OperationId>, status: OperationStatus) -> Self {
        Self {
            id: id.into(),
            status,
            transaction_id: None,
            result: None,
            failure_reason: None,
        }
    }

    /// Set the provider transaction id
    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    /// Attach a result
    pub fn with_result(mut self, result: OperationResult) -> Self {
        self.result = Some(result);
        self
    }

    /// Attach a failure reason
    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }
}

/// Message signing submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSigningRequest {
    pub idempotency_key: Uuid,
    pub account_id: AccountId,
    pub asset_id: AssetId,
    pub message: String,
    pub encoding: MessageEncoding,
}

/// Asset transfer submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTransferRequest {
    pub idempotency_key: Uuid,
    pub account_id: AccountId,
    pub asset_id: AssetId,
    pub destination: String,
    pub amount: String,
}

impl MessageSigningRequest {
    /// Create a request with a fresh idempotency key
    pub fn new(
        account_id: impl Into<AccountId>,
        asset_id: impl Into<AssetId>,
        message: impl Into<String>,
        encoding: MessageEncoding,
    ) -> Self {
        Self {
            idempotency_key: Uuid::new_v4(),
            account_id: account_id.into(),
            asset_id: asset_id.into(),
            message: message.into(),
            encoding,
        }
    }
}

impl AssetTransferRequest {
    /// Create a request with a fresh idempotency key
    pub fn new(
        account_id: impl Into<AccountId>,
        asset_id: impl Into<AssetId>,
        destination: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            idempotency_key: Uuid::new_v4(),
            account_id: account_id.into(),
            asset_id: asset_id.into(),
            destination: destination.into(),
            amount: amount.into(),
        }
    }
}

/// A mutating request that runs as a remote operation
///
/// The idempotency key is generated once per request and travels with every
/// submission of it, so a provider can recognise a duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OperationRequest {
    SignMessage(MessageSigningRequest),
    Transfer(AssetTransferRequest),
}

impl OperationRequest {
    /// Request a message signature
    pub fn sign_message(
        account_id: impl Into<AccountId>,
        asset_id: impl Into<AssetId>,
        message: impl Into<String>,
        encoding: MessageEncoding,
    ) -> Self {
        OperationRequest::SignMessage(MessageSigningRequest::new(
            account_id, asset_id, message, encoding,
        ))
    }

    /// Request an asset transfer
    pub fn transfer(
        account_id: impl Into<AccountId>,
        asset_id: impl Into<AssetId>,
        destination: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        OperationRequest::Transfer(AssetTransferRequest::new(
            account_id,
            asset_id,
            destination,
            amount,
        ))
    }

    /// Idempotency key of this request
    pub fn idempotency_key(&self) -> Uuid {
        match self {
            OperationRequest::SignMessage(r) => r.idempotency_key,
            OperationRequest::Transfer(r) => r.idempotency_key,
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            OperationRequest::SignMessage(_) => "sign_message",
            OperationRequest::Transfer(_) => "transfer",
        }
    }
}

/// A submitted operation that has reached the ready state (or finished early)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    /// Operation identifier
    pub operation_id: OperationId,
    /// Idempotency key of the originating request
    pub idempotency_key: Uuid,
    /// Last observed snapshot
    pub operation: RemoteOperation,
}

impl OperationHandle {
    /// Provider transaction id to co-sign, if reported
    pub fn transaction_id(&self) -> Option<&str> {
        self.operation.transaction_id.as_deref()
    }

    /// The operation completed before the ready state was observed
    pub fn is_completed(&self) -> bool {
        self.operation.status == OperationStatus::Completed
    }
}
