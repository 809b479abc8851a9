//! Core types for MPC wallet connections
//!
//! Account and asset snapshots returned by the remote provider, balances,
//! signatures and transaction hashes produced by remote operations.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an authenticated device (one credential session per device)
pub type DeviceId = String;

/// Remote wallet account identifier
pub type AccountId = String;

/// Remote asset identifier (an asset is scoped to an account)
pub type AssetId = String;

/// Remote operation identifier
pub type OperationId = String;

/// Wallet metadata the host keeps for a connected MPC wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletMetadata {
    /// Device the wallet is bound to
    pub device_id: DeviceId,
    /// Provider label, for display only
    #[serde(default)]
    pub provider: Option<String>,
}

impl WalletMetadata {
    /// Create metadata for a device
    pub fn new(device_id: impl Into<DeviceId>) -> Self {
        Self {
            device_id: device_id.into(),
            provider: None,
        }
    }

    /// Set the provider label
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

/// Balance of an asset, kept in the smallest unit with its decimals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Raw balance value (smallest unit)
    pub raw: String,
    /// Human-readable balance with decimals applied
    pub formatted: String,
    /// Number of decimals
    pub decimals: u8,
}

impl Balance {
    /// Create a new balance
    pub fn new(raw: impl Into<String>, decimals: u8) -> Self {
        let raw = raw.into();
        let formatted = Self::format_balance(&raw, decimals);
        Self {
            raw,
            formatted,
            decimals,
        }
    }

    fn format_balance(raw: &str, decimals: u8) -> String {
        let raw_value: u128 = raw.parse().unwrap_or(0);
        if raw_value == 0 {
            return "0".to_string();
        }

        // Past u128 range the raw value is the only faithful rendering.
        let Some(divisor) = 10u128.checked_pow(decimals as u32) else {
            return raw.to_string();
        };
        let whole = raw_value / divisor;
        let fraction = raw_value % divisor;

        if fraction == 0 {
            whole.to_string()
        } else {
            let fraction_str = format!("{:0>width$}", fraction, width = decimals as usize);
            format!("{}.{}", whole, fraction_str.trim_end_matches('0'))
        }
    }

    /// Check if balance is zero
    pub fn is_zero(&self) -> bool {
        self.raw.parse::<u128>().map(|v| v == 0).unwrap_or(true)
    }
}

/// An asset held by a remote wallet account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAsset {
    /// Asset identifier
    pub id: AssetId,
    /// Owning account
    pub account_id: AccountId,
    /// On-chain address of the asset holder
    pub address: String,
    /// Ticker symbol (ETH, MATIC, ...)
    pub symbol: String,
    /// Blockchain the asset lives on
    pub chain: String,
    /// Balance, present only when requested with balances
    #[serde(default)]
    pub balance: Option<Balance>,
}

/// A remote wallet account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier
    pub id: AccountId,
    /// Assets known on the account
    #[serde(default)]
    pub assets: Vec<AccountAsset>,
}

impl Account {
    /// Find an asset by id
    pub fn asset(&self, asset_id: &str) -> Option<&AccountAsset> {
        self.assets.iter().find(|a| a.id == asset_id)
    }
}

/// Cached snapshot of a device's remote accounts
///
/// Always replaced as a whole; never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAccountsDetails {
    /// Device the snapshot belongs to
    pub device_id: DeviceId,
    /// All accounts with their assets
    pub accounts: Vec<Account>,
    /// Primary account
    pub first_account: Account,
}

impl WalletAccountsDetails {
    /// Build a snapshot; the wallet must expose at least one account
    pub fn new(device_id: impl Into<DeviceId>, accounts: Vec<Account>) -> Result<Self> {
        let device_id = device_id.into();
        let first_account = accounts
            .first()
            .cloned()
            .ok_or_else(|| Error::AccountNotFound(format!("no accounts for {}", device_id)))?;

        Ok(Self {
            device_id,
            accounts,
            first_account,
        })
    }

    /// Find an account by id
    pub fn account(&self, account_id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == account_id)
    }

    /// All assets across accounts
    pub fn assets(&self) -> impl Iterator<Item = &AccountAsset> {
        self.accounts.iter().flat_map(|a| a.assets.iter())
    }
}

/// How a message payload should be interpreted by the signer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageEncoding {
    /// Plain UTF-8 text
    #[default]
    Utf8,
    /// Hex encoded bytes
    Hex,
}

impl fmt::Display for MessageEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageEncoding::Utf8 => write!(f, "utf8"),
            MessageEncoding::Hex => write!(f, "hex"),
        }
    }
}

/// Network fee estimate for a transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// Asset the fee is charged in
    pub asset_id: AssetId,
    /// Estimated fee
    pub fee: Balance,
}

/// Signature produced by a completed signing operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Parse a hex signature, with or without `0x` prefix
    pub fn from_hex(value: &str) -> Result<Self> {
        let stripped = value.strip_prefix("0x").unwrap_or(value);
        Ok(Self(hex::decode(stripped)?))
    }

    /// Raw signature bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// `0x`-prefixed hex encoding
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Transaction hash produced by a completed transfer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
