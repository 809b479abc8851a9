//! Credential model
//!
//! A device holds three tiers of credentials issued by the MPC provider:
//!
//! - **Access token**: short-lived, authorizes reads and operations
//! - **Refresh token**: mints a new access token
//! - **Bootstrap token**: longest-lived, mints a whole new token set
//!
//! Tokens are JWT-shaped (`header.payload.signature`). Only the payload claims
//! are decoded locally; the signature is checked by the provider, never here.

use crate::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded, immutable credential
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    raw: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    audience: Vec<String>,
    issuer: String,
}

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    iat: Option<i64>,
    exp: i64,
    #[serde(default)]
    aud: Option<Audience>,
    #[serde(default)]
    iss: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

fn timestamp(secs: i64, claim: &str) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| Error::InvalidToken(format!("{} out of range: {}", claim, secs)))
}

impl Token {
    /// Decode a credential received from the provider
    pub fn decode(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let mut parts = raw.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
            _ => return Err(Error::InvalidToken("expected three segments".into())),
        };

        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        let claims: Claims = serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidToken(format!("invalid claims: {}", e)))?;

        let expires_at = timestamp(claims.exp, "exp")?;
        let issued_at = match claims.iat {
            Some(iat) => timestamp(iat, "iat")?,
            None => expires_at,
        };
        let audience = match claims.aud {
            Some(Audience::One(aud)) => vec![aud],
            Some(Audience::Many(aud)) => aud,
            None => Vec::new(),
        };

        Ok(Self {
            raw,
            issued_at,
            expires_at,
            audience,
            issuer: claims.iss.unwrap_or_default(),
        })
    }

    /// The encoded credential, as sent to the provider
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Issue time
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Expiration time
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Audience claim
    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    /// Issuer claim
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// A token is valid at `now` iff `now < expires_at`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Validity with a clock-skew grace period subtracted from the lifetime
    pub fn is_valid_with_leeway(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        self.is_valid_at(now + leeway)
    }
}

// Raw credentials never reach logs.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

/// Credential tier, in fallback order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTier {
    /// Access token still valid, no network needed
    Access,
    /// Access expired, refresh token still valid
    Refresh,
    /// Refresh expired, bootstrap token still valid
    Bootstrap,
}

impl fmt::Display for TokenTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenTier::Access => write!(f, "access"),
            TokenTier::Refresh => write!(f, "refresh"),
            TokenTier::Bootstrap => write!(f, "bootstrap"),
        }
    }
}

/// The three credentials of one authentication session
///
/// Replaced wholesale after every refresh; never merged field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: Token,
    pub refresh_token: Token,
    pub bootstrap_token: Token,
}

impl TokenSet {
    /// Create a token set from decoded tokens
    pub fn new(access_token: Token, refresh_token: Token, bootstrap_token: Token) -> Self {
        Self {
            access_token,
            refresh_token,
            bootstrap_token,
        }
    }

    /// Decode a token set from the raw credentials returned by the provider
    pub fn decode(access: &str, refresh: &str, bootstrap: &str) -> Result<Self> {
        Ok(Self::new(
            Token::decode(access)?,
            Token::decode(refresh)?,
            Token::decode(bootstrap)?,
        ))
    }

    /// First tier that still holds a valid token, if any
    pub fn usable_tier(&self, now: DateTime<Utc>, leeway: Duration) -> Option<TokenTier> {
        if self.access_token.is_valid_with_leeway(now, leeway) {
            Some(TokenTier::Access)
        } else if self.refresh_token.is_valid_with_leeway(now, leeway) {
            Some(TokenTier::Refresh)
        } else if self.bootstrap_token.is_valid_with_leeway(now, leeway) {
            Some(TokenTier::Bootstrap)
        } else {
            None
        }
    }
}
