//! MPC connection façade
//!
//! Entry point for hosts. Every call resolves a valid access token first,
//! then performs the read or submits the mutating operation and polls it to
//! completion. Failures are surfaced as they are; nothing is retried here.
//!
//! ```text
//! host ──► MpcConnectionService ──► TokenLifecycleManager ──► RefreshCoordinator
//!                  │                                                  │
//!                  ├──► NetworkGateway (reads)                        ▼
//!                  └──► RemoteOperationPoller ──► SigningParticipant  storage
//! ```

use crate::config::ConnectionConfig;
use crate::gateway::{NetworkGateway, SigningParticipant};
use crate::lifecycle::TokenLifecycleManager;
use crate::operation::{AssetTransferRequest, OperationRequest, RemoteOperation};
use crate::poller::{PollCancellation, RemoteOperationPoller, signature_of, tx_hash_of};
use crate::storage::CredentialStorage;
use crate::{
    Account, AccountAsset, Error, FeeEstimate, MessageEncoding, Result, Signature, Token,
    TokenSet, TxHash, WalletAccountsDetails, WalletMetadata,
};
use futures_util::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Why the host has to re-authenticate the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectReason {
    /// No credentials are stored
    NoCredentials,
    /// Every credential tier expired
    CredentialsExpired,
}

/// Host callback for credentials that can only be renewed out-of-band
pub trait ReconnectHandler: Send + Sync {
    /// Ask the user to reconnect the wallet of `device_id`
    fn ask_to_reconnect(&self, device_id: &str, reason: ReconnectReason);
}

/// Public entry point for MPC wallet operations
pub struct MpcConnectionService {
    storage: Arc<dyn CredentialStorage>,
    gateway: Arc<dyn NetworkGateway>,
    participant: Arc<dyn SigningParticipant>,
    tokens: Arc<TokenLifecycleManager>,
    poller: RemoteOperationPoller,
    reconnect: Option<Arc<dyn ReconnectHandler>>,
}

impl MpcConnectionService {
    /// Create a service over the given collaborators
    pub fn new(
        config: ConnectionConfig,
        storage: Arc<dyn CredentialStorage>,
        gateway: Arc<dyn NetworkGateway>,
        participant: Arc<dyn SigningParticipant>,
    ) -> Self {
        let tokens = Arc::new(TokenLifecycleManager::new(
            Arc::clone(&storage),
            Arc::clone(&gateway),
            config.token,
        ));
        let poller =
            RemoteOperationPoller::new(Arc::clone(&gateway), Arc::clone(&tokens), config.poll);

        Self {
            storage,
            gateway,
            participant,
            tokens,
            poller,
            reconnect: None,
        }
    }

    /// Register the host's reconnect callback
    pub fn with_reconnect_handler(mut self, handler: Arc<dyn ReconnectHandler>) -> Self {
        self.reconnect = Some(handler);
        self
    }

    /// The token lifecycle manager
    pub fn tokens(&self) -> &Arc<TokenLifecycleManager> {
        &self.tokens
    }

    /// The operation poller
    pub fn poller(&self) -> &RemoteOperationPoller {
        &self.poller
    }

    fn surface<T>(&self, device_id: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            let reason = match e {
                Error::NoCredentials(_) => Some(ReconnectReason::NoCredentials),
                Error::AuthExhausted(_) => Some(ReconnectReason::CredentialsExpired),
                _ => None,
            };
            match (reason, &self.reconnect) {
                (Some(reason), Some(handler)) => {
                    info!(device_id, ?reason, "Asking host to reconnect wallet");
                    handler.ask_to_reconnect(device_id, reason);
                }
                (Some(reason), None) => {
                    warn!(device_id, ?reason, "Reconnect required but no handler registered");
                }
                _ => {}
            }
        }
        result
    }

    async fn access_token(&self, device_id: &str) -> Result<Token> {
        self.tokens.resolve_access_token(device_id).await
    }

    // ========================================================================
    // Connection
    // ========================================================================

    /// Store the token set obtained by authenticating a new device
    pub async fn connect(&self, device_id: &str, token_set: &TokenSet) -> Result<()> {
        self.tokens.establish(device_id, token_set).await
    }

    /// Forget the credentials of a disconnected wallet
    pub async fn disconnect(&self, metadata: &WalletMetadata) -> Result<()> {
        self.tokens.forget(&metadata.device_id).await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Cached accounts snapshot, fetched on first use
    #[instrument(skip(self, metadata), fields(device_id = %metadata.device_id))]
    pub async fn accounts_details(&self, metadata: &WalletMetadata) -> Result<WalletAccountsDetails> {
        let result = self.cached_accounts_details(metadata).await;
        self.surface(&metadata.device_id, result)
    }

    async fn cached_accounts_details(
        &self,
        metadata: &WalletMetadata,
    ) -> Result<WalletAccountsDetails> {
        let cached = self
            .storage
            .retrieve_accounts_details(&metadata.device_id)
            .await?;
        match cached {
            Some(details) => Ok(details),
            None => self.fetch_accounts_details(metadata).await,
        }
    }

    /// Fetch the accounts snapshot and replace the cached copy
    #[instrument(skip(self, metadata), fields(device_id = %metadata.device_id))]
    pub async fn refresh_accounts_details(
        &self,
        metadata: &WalletMetadata,
    ) -> Result<WalletAccountsDetails> {
        let result = self.fetch_accounts_details(metadata).await;
        self.surface(&metadata.device_id, result)
    }

    async fn fetch_accounts_details(&self, metadata: &WalletMetadata) -> Result<WalletAccountsDetails> {
        let token = self.access_token(&metadata.device_id).await?;
        let accounts = self.gateway.list_accounts(&token).await?;

        let accounts = try_join_all(accounts.into_iter().map(|account| {
            let token = &token;
            async move {
                let assets = self
                    .gateway
                    .list_account_assets(&account.id, token, false)
                    .await?;
                Ok::<_, Error>(Account { assets, ..account })
            }
        }))
        .await?;

        let details = WalletAccountsDetails::new(metadata.device_id.clone(), accounts)?;
        self.storage.store_accounts_details(&details).await?;
        debug!(accounts = details.accounts.len(), "Accounts snapshot stored");
        Ok(details)
    }

    /// Assets of every account with their current balances
    #[instrument(skip(self, metadata), fields(device_id = %metadata.device_id))]
    pub async fn get_balances_for(&self, metadata: &WalletMetadata) -> Result<Vec<AccountAsset>> {
        let result = self.fetch_balances(metadata).await;
        self.surface(&metadata.device_id, result)
    }

    async fn fetch_balances(&self, metadata: &WalletMetadata) -> Result<Vec<AccountAsset>> {
        let details = self.cached_accounts_details(metadata).await?;
        let token = self.access_token(&metadata.device_id).await?;

        let per_account = try_join_all(
            details
                .accounts
                .iter()
                .map(|account| self.gateway.list_account_assets(&account.id, &token, true)),
        )
        .await?;

        Ok(per_account.into_iter().flatten().collect())
    }

    /// Estimate the network fee of a transfer
    #[instrument(skip(self, metadata, asset), fields(device_id = %metadata.device_id, asset_id = %asset.id))]
    pub async fn estimate_network_fee(
        &self,
        metadata: &WalletMetadata,
        asset: &AccountAsset,
        destination: &str,
        amount: &str,
    ) -> Result<FeeEstimate> {
        let request = AssetTransferRequest::new(
            asset.account_id.clone(),
            asset.id.clone(),
            destination,
            amount,
        );
        let result = match self.access_token(&metadata.device_id).await {
            Ok(token) => self.gateway.estimate_network_fee(&token, &request).await,
            Err(e) => Err(e),
        };
        self.surface(&metadata.device_id, result)
    }

    // ========================================================================
    // Remote Operations
    // ========================================================================

    /// Sign a message with the key behind `asset`
    #[instrument(skip(self, metadata, asset, message, cancel), fields(device_id = %metadata.device_id, asset_id = %asset.id))]
    pub async fn sign_message(
        &self,
        metadata: &WalletMetadata,
        asset: &AccountAsset,
        message: &str,
        encoding: MessageEncoding,
        cancel: Option<&PollCancellation>,
    ) -> Result<Signature> {
        let request = OperationRequest::sign_message(
            asset.account_id.clone(),
            asset.id.clone(),
            message,
            encoding,
        );
        let result = self
            .run_operation(&metadata.device_id, &request, cancel)
            .await
            .and_then(|operation| signature_of(&operation));
        self.surface(&metadata.device_id, result)
    }

    /// Transfer `amount` of `asset` to `destination`
    #[instrument(skip(self, metadata, asset, cancel), fields(device_id = %metadata.device_id, asset_id = %asset.id))]
    pub async fn transfer_asset(
        &self,
        metadata: &WalletMetadata,
        asset: &AccountAsset,
        destination: &str,
        amount: &str,
        cancel: Option<&PollCancellation>,
    ) -> Result<TxHash> {
        let request = OperationRequest::transfer(
            asset.account_id.clone(),
            asset.id.clone(),
            destination,
            amount,
        );
        let result = self
            .run_operation(&metadata.device_id, &request, cancel)
            .await
            .and_then(|operation| tx_hash_of(&operation));
        self.surface(&metadata.device_id, result)
    }

    /// Submit once, wait for ready, co-sign, wait for completion
    async fn run_operation(
        &self,
        device_id: &str,
        request: &OperationRequest,
        cancel: Option<&PollCancellation>,
    ) -> Result<RemoteOperation> {
        let handle = self
            .poller
            .submit_and_await_ready(device_id, request, cancel)
            .await?;

        if handle.is_completed() {
            debug!(operation_id = %handle.operation_id, "Operation completed before co-signing");
            return Ok(handle.operation);
        }

        let transaction_id = handle.transaction_id().unwrap_or(&handle.operation_id);
        self.participant.participate(device_id, transaction_id).await?;
        info!(operation_id = %handle.operation_id, "Device share contributed");

        self.poller
            .await_completion(device_id, &handle.operation_id, cancel)
            .await
    }
}
