//! # MPC Connect Core
//!
//! Connection and credential lifecycle for wallets whose keys are held by a
//! remote multi-party-computation (MPC) provider.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Token Lifecycle**: Three-tier credentials (access, refresh, bootstrap) with local expiry checks
//! - **Single-Flight Refresh**: At most one refresh per device in flight, shared by all concurrent callers
//! - **Operation Polling**: Signing and transfer operations polled until ready or completed, with deadlines and cancellation
//! - **Connection Façade**: Balance reads, message signing and asset transfers on top of the above
//!
//! Storage, transport and the device-side signing protocol are supplied by
//! the host through the [`CredentialStorage`], [`NetworkGateway`] and
//! [`SigningParticipant`] traits.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mpc_connect_core::{ConnectionConfig, MpcConnectionService, MemoryCredentialStorage, WalletMetadata};
//! use std::sync::Arc;
//!
//! let service = MpcConnectionService::new(
//!     ConnectionConfig::default(),
//!     Arc::new(MemoryCredentialStorage::new()),
//!     Arc::new(my_gateway),
//!     Arc::new(my_participant),
//! );
//!
//! // Store the credentials from the initial device authentication
//! service.connect("device-1", &token_set).await?;
//!
//! // Balances for every account, refreshing the access token if needed
//! let wallet = WalletMetadata::new("device-1");
//! let assets = service.get_balances_for(&wallet).await?;
//!
//! // Transfer, polled until the provider reports completion
//! let tx_hash = service.transfer_asset(&wallet, &assets[0], "0x...", "1000", None).await?;
//! ```
//!
//! ## Credential Fallback
//!
//! A valid access token is used without any network call. An expired access
//! token is refreshed with the refresh token, an expired refresh token with
//! the bootstrap token. When all three are expired the call fails locally
//! with [`Error::AuthExhausted`] and the host is asked to reconnect.

pub mod config;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod operation;
pub mod poller;
pub mod service;
pub mod single_flight;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{ConnectionConfig, PollPolicy, TokenPolicy};
pub use error::{Error, Result};
pub use gateway::{NetworkGateway, SigningParticipant};
pub use lifecycle::{RefreshCoordinator, RefreshGrant, TokenLifecycleManager};
pub use operation::{
    AssetTransferRequest, MessageSigningRequest, OperationHandle, OperationRequest,
    OperationResult, OperationStatus, RemoteOperation,
};
pub use poller::{PollCancellation, RemoteOperationPoller, WaitTarget};
pub use service::{MpcConnectionService, ReconnectHandler, ReconnectReason};
pub use single_flight::SingleFlight;
pub use storage::{CredentialStorage, MemoryCredentialStorage};
pub use token::{Token, TokenSet, TokenTier};
pub use types::{
    Account, AccountAsset, AccountId, AssetId, Balance, DeviceId, FeeEstimate, MessageEncoding,
    OperationId, Signature, TxHash, WalletAccountsDetails, WalletMetadata,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
