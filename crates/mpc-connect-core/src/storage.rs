//! Credential Storage Interface
//!
//! Durable per-device storage of token sets and cached account snapshots.
//! The host provides the real backend (keychain, encrypted database); this
//! crate only relies on the contract below:
//!
//! - Writes replace the stored value as a whole, atomically
//! - A missing value is `Ok(None)`, not an error
//!
//! `MemoryCredentialStorage` is an in-process backend for tests and hosts
//! that do not persist across restarts.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mpc_connect_core::storage::{CredentialStorage, MemoryCredentialStorage};
//!
//! let storage = MemoryCredentialStorage::new();
//! storage.store_token_set("device-1", &token_set).await?;
//! let restored = storage.retrieve_token_set("device-1").await?;
//! ```

use crate::{Result, TokenSet, WalletAccountsDetails};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Trait for credential storage backends
#[async_trait]
pub trait CredentialStorage: Send + Sync {
    /// Replace the token set of a device
    async fn store_token_set(&self, device_id: &str, token_set: &TokenSet) -> Result<()>;

    /// Load the token set of a device
    async fn retrieve_token_set(&self, device_id: &str) -> Result<Option<TokenSet>>;

    /// Remove the token set of a device
    async fn clear_token_set(&self, device_id: &str) -> Result<()>;

    /// Replace the cached accounts snapshot of `details.device_id`
    async fn store_accounts_details(&self, details: &WalletAccountsDetails) -> Result<()>;

    /// Load the cached accounts snapshot of a device
    async fn retrieve_accounts_details(
        &self,
        device_id: &str,
    ) -> Result<Option<WalletAccountsDetails>>;
}

/// In-memory credential storage
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStorage {
    token_sets: Arc<RwLock<HashMap<String, TokenSet>>>,
    accounts: Arc<RwLock<HashMap<String, WalletAccountsDetails>>>,
}

impl MemoryCredentialStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of devices with a stored token set
    pub async fn device_count(&self) -> usize {
        self.token_sets.read().await.len()
    }
}

#[async_trait]
impl CredentialStorage for MemoryCredentialStorage {
    async fn store_token_set(&self, device_id: &str, token_set: &TokenSet) -> Result<()> {
        let mut token_sets = self.token_sets.write().await;
        token_sets.insert(device_id.to_string(), token_set.clone());
        Ok(())
    }

    async fn retrieve_token_set(&self, device_id: &str) -> Result<Option<TokenSet>> {
        let token_sets = self.token_sets.read().await;
        Ok(token_sets.get(device_id).cloned())
    }

    async fn clear_token_set(&self, device_id: &str) -> Result<()> {
        let mut token_sets = self.token_sets.write().await;
        token_sets.remove(device_id);
        Ok(())
    }

    async fn store_accounts_details(&self, details: &WalletAccountsDetails) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(details.device_id.clone(), details.clone());
        Ok(())
    }

    async fn retrieve_accounts_details(
        &self,
        device_id: &str,
    ) -> Result<Option<WalletAccountsDetails>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(device_id).cloned())
    }
}
