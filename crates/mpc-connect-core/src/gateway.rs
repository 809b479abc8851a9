//! Remote provider interfaces
//!
//! `NetworkGateway` abstracts the stateless calls made to the MPC provider.
//! Implementations own transport concerns and map them onto [`Error`]:
//!
//! - connectivity problems → [`Error::NetworkUnavailable`]
//! - rejected refresh / bootstrap credentials → [`Error::RefreshFailed`]
//!
//! `SigningParticipant` is the device-side half of a signature: once an
//! operation is ready, the device contributes its key share. The protocol
//! itself is opaque to this crate.
//!
//! [`Error`]: crate::Error
//! [`Error::NetworkUnavailable`]: crate::Error::NetworkUnavailable
//! [`Error::RefreshFailed`]: crate::Error::RefreshFailed

use crate::operation::{AssetTransferRequest, MessageSigningRequest, RemoteOperation};
use crate::{Account, AccountAsset, FeeEstimate, Result, Token, TokenSet};
use async_trait::async_trait;

/// Stateless calls to the MPC provider
#[async_trait]
pub trait NetworkGateway: Send + Sync {
    /// Mint a new token set from a refresh token
    async fn refresh_access_token(&self, refresh_token: &Token) -> Result<TokenSet>;

    /// Mint a new token set (including a new refresh token) from a bootstrap token
    async fn refresh_via_bootstrap(&self, bootstrap_token: &Token) -> Result<TokenSet>;

    /// List the wallet's accounts
    async fn list_accounts(&self, access_token: &Token) -> Result<Vec<Account>>;

    /// List the assets of an account
    ///
    /// # Arguments
    /// * `account_id` - Account to list
    /// * `access_token` - Valid access token
    /// * `include_balances` - Whether to populate `AccountAsset::balance`
    async fn list_account_assets(
        &self,
        account_id: &str,
        access_token: &Token,
        include_balances: bool,
    ) -> Result<Vec<AccountAsset>>;

    /// Submit a message signing operation
    async fn submit_message_signing(
        &self,
        access_token: &Token,
        request: &MessageSigningRequest,
    ) -> Result<RemoteOperation>;

    /// Submit an asset transfer operation
    async fn submit_asset_transfer(
        &self,
        access_token: &Token,
        request: &AssetTransferRequest,
    ) -> Result<RemoteOperation>;

    /// Fetch the current state of an operation
    async fn poll_operation(
        &self,
        access_token: &Token,
        operation_id: &str,
    ) -> Result<RemoteOperation>;

    /// Estimate the network fee of a transfer
    async fn estimate_network_fee(
        &self,
        access_token: &Token,
        request: &AssetTransferRequest,
    ) -> Result<FeeEstimate>;
}

/// Device-side participation in a ready signing operation
#[async_trait]
pub trait SigningParticipant: Send + Sync {
    /// Contribute the device's share to the provider transaction
    ///
    /// # Arguments
    /// * `device_id` - Device whose key share signs
    /// * `transaction_id` - Provider transaction reported by the ready operation
    async fn participate(&self, device_id: &str, transaction_id: &str) -> Result<()>;
}
