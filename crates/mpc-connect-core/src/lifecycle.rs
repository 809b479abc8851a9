//! Token lifecycle
//!
//! `TokenLifecycleManager` hands out a currently valid access token for a
//! device, falling back through the credential tiers:
//!
//! 1. valid access token → returned as is, no network
//! 2. valid refresh token → single-flight refresh
//! 3. valid bootstrap token → single-flight bootstrap refresh
//! 4. nothing valid → `AuthExhausted`, no network
//!
//! `RefreshCoordinator` guarantees at most one refresh per device at a time.
//! Refresh and bootstrap share the same per-device flight.

use crate::config::TokenPolicy;
use crate::gateway::NetworkGateway;
use crate::single_flight::SingleFlight;
use crate::storage::CredentialStorage;
use crate::{DeviceId, Error, Result, Token, TokenSet, TokenTier};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Credential used to mint a new token set
#[derive(Debug, Clone)]
pub enum RefreshGrant {
    /// Refresh with a valid refresh token
    Refresh(Token),
    /// Re-establish the whole set with a valid bootstrap token
    Bootstrap(Token),
}

impl RefreshGrant {
    fn tier(&self) -> TokenTier {
        match self {
            RefreshGrant::Refresh(_) => TokenTier::Refresh,
            RefreshGrant::Bootstrap(_) => TokenTier::Bootstrap,
        }
    }
}

fn into_refresh_error(error: Error) -> Error {
    match error {
        Error::NetworkUnavailable(_) | Error::RefreshFailed(_) => error,
        other => Error::RefreshFailed(other.to_string()),
    }
}

/// Deduplicates concurrent refreshes per device and persists their result
pub struct RefreshCoordinator {
    gateway: Arc<dyn NetworkGateway>,
    storage: Arc<dyn CredentialStorage>,
    flights: SingleFlight<DeviceId, TokenSet>,
    policy: TokenPolicy,
}

impl RefreshCoordinator {
    /// Create a coordinator
    pub fn new(
        gateway: Arc<dyn NetworkGateway>,
        storage: Arc<dyn CredentialStorage>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            gateway,
            storage,
            flights: SingleFlight::new(),
            policy,
        }
    }

    /// Mint and persist a new token set for `device_id`
    ///
    /// Callers arriving while a refresh for the same device is running join
    /// it and receive the same token set or the same error.
    pub async fn refresh(&self, device_id: &str, grant: RefreshGrant) -> Result<TokenSet> {
        let gateway = Arc::clone(&self.gateway);
        let storage = Arc::clone(&self.storage);
        let leeway = self.policy.leeway();
        let device = device_id.to_string();

        self.flights
            .run(device_id.to_string(), move || async move {
                // A flight that finished just before this one started may already
                // have stored a fresh set.
                if let Some(current) = storage.retrieve_token_set(&device).await? {
                    if current.access_token.is_valid_with_leeway(Utc::now(), leeway) {
                        debug!(device_id = %device, "Stored access token already refreshed");
                        return Ok(current);
                    }
                }

                let tier = grant.tier();
                info!(device_id = %device, tier = %tier, "Refreshing token set");

                let result = match &grant {
                    RefreshGrant::Refresh(token) => gateway.refresh_access_token(token).await,
                    RefreshGrant::Bootstrap(token) => gateway.refresh_via_bootstrap(token).await,
                };
                let token_set = match result {
                    Ok(token_set) => token_set,
                    Err(e) => {
                        warn!(device_id = %device, tier = %tier, error = %e, "Token refresh failed");
                        return Err(into_refresh_error(e));
                    }
                };

                storage.store_token_set(&device, &token_set).await?;
                debug!(device_id = %device, expires_at = %token_set.access_token.expires_at(), "Token set replaced");
                Ok(token_set)
            })
            .await
    }

    /// Whether a refresh for `device_id` is running
    pub fn is_refreshing(&self, device_id: &str) -> bool {
        self.flights.is_in_flight(&device_id.to_string())
    }
}

/// Resolves a valid access token per device
pub struct TokenLifecycleManager {
    storage: Arc<dyn CredentialStorage>,
    coordinator: RefreshCoordinator,
    policy: TokenPolicy,
}

impl TokenLifecycleManager {
    /// Create a manager over the given collaborators
    pub fn new(
        storage: Arc<dyn CredentialStorage>,
        gateway: Arc<dyn NetworkGateway>,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            coordinator: RefreshCoordinator::new(gateway, Arc::clone(&storage), policy.clone()),
            storage,
            policy,
        }
    }

    async fn load(&self, device_id: &str) -> Result<TokenSet> {
        self.storage
            .retrieve_token_set(device_id)
            .await?
            .ok_or_else(|| Error::NoCredentials(device_id.to_string()))
    }

    /// Return a currently valid access token for `device_id`
    #[instrument(skip(self))]
    pub async fn resolve_access_token(&self, device_id: &str) -> Result<Token> {
        let token_set = self.load(device_id).await?;

        let grant = match token_set.usable_tier(Utc::now(), self.policy.leeway()) {
            Some(TokenTier::Access) => return Ok(token_set.access_token),
            Some(TokenTier::Refresh) => RefreshGrant::Refresh(token_set.refresh_token),
            Some(TokenTier::Bootstrap) => RefreshGrant::Bootstrap(token_set.bootstrap_token),
            None => {
                warn!(device_id, "All credential tiers expired");
                return Err(Error::AuthExhausted(device_id.to_string()));
            }
        };

        let refreshed = self.coordinator.refresh(device_id, grant).await?;
        Ok(refreshed.access_token)
    }

    /// Tier `resolve_access_token` would use right now
    pub async fn usable_tier(&self, device_id: &str) -> Result<Option<TokenTier>> {
        let token_set = self.load(device_id).await?;
        Ok(token_set.usable_tier(Utc::now(), self.policy.leeway()))
    }

    /// Persist the token set obtained by the initial device authentication
    #[instrument(skip(self, token_set))]
    pub async fn establish(&self, device_id: &str, token_set: &TokenSet) -> Result<()> {
        self.storage.store_token_set(device_id, token_set).await?;
        info!(device_id, "Credentials established");
        Ok(())
    }

    /// Drop the stored token set of a device
    #[instrument(skip(self))]
    pub async fn forget(&self, device_id: &str) -> Result<()> {
        self.storage.clear_token_set(device_id).await?;
        info!(device_id, "Credentials cleared");
        Ok(())
    }

    /// The refresh coordinator
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }
}
