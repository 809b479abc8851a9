//! Connection configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Credential validity policy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenPolicy {
    /// Seconds subtracted from every token's lifetime to absorb clock skew
    pub expiry_leeway_secs: u64,
}

impl TokenPolicy {
    /// Set the expiry leeway
    pub fn with_expiry_leeway(mut self, secs: u64) -> Self {
        self.expiry_leeway_secs = secs;
        self
    }

    /// Leeway as a chrono duration
    pub fn leeway(&self) -> chrono::Duration {
        let secs = self.expiry_leeway_secs.min(u32::MAX as u64);
        chrono::Duration::seconds(secs as i64)
    }
}

/// Remote operation polling policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay before the second poll in milliseconds
    pub initial_interval_ms: u64,
    /// Upper bound for the delay between polls in milliseconds
    pub max_interval_ms: u64,
    /// Delay multiplier applied after every poll (1.0 = fixed interval)
    pub backoff_multiplier: f64,
    /// Deadline for an operation to become ready to sign
    pub ready_timeout_ms: u64,
    /// Deadline for an operation to complete after co-signing
    pub completion_timeout_ms: u64,
    /// Optional cap on the number of polls per wait, independent of the deadline
    pub max_polls: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval_ms: 1000,
            max_interval_ms: 5000,
            backoff_multiplier: 1.5,
            ready_timeout_ms: 60_000,
            completion_timeout_ms: 120_000,
            max_polls: None,
        }
    }
}

impl PollPolicy {
    /// Fixed-interval polling
    pub fn fixed(interval_ms: u64) -> Self {
        Self {
            initial_interval_ms: interval_ms,
            max_interval_ms: interval_ms,
            backoff_multiplier: 1.0,
            ..Default::default()
        }
    }

    /// Set both deadlines
    pub fn with_timeouts(mut self, ready_ms: u64, completion_ms: u64) -> Self {
        self.ready_timeout_ms = ready_ms;
        self.completion_timeout_ms = completion_ms;
        self
    }

    /// Set the poll budget
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }

    /// Set exponential backoff
    pub fn with_backoff(mut self, multiplier: f64, max_interval_ms: u64) -> Self {
        self.backoff_multiplier = multiplier;
        self.max_interval_ms = max_interval_ms;
        self
    }

    /// Delay to wait after the poll with the given zero-based index
    pub fn interval_after(&self, poll_index: u32) -> Duration {
        let multiplier = self.backoff_multiplier.max(1.0);
        let exponent = i32::try_from(poll_index).unwrap_or(i32::MAX);
        let delay = self.initial_interval_ms as f64 * multiplier.powi(exponent);
        let capped = delay.min(self.max_interval_ms.max(self.initial_interval_ms) as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Top-level configuration for a connection service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Credential validity policy
    #[serde(default)]
    pub token: TokenPolicy,
    /// Polling policy for remote operations
    #[serde(default)]
    pub poll: PollPolicy,
}

impl ConnectionConfig {
    /// Set the token policy
    pub fn with_token_policy(mut self, token: TokenPolicy) -> Self {
        self.token = token;
        self
    }

    /// Set the poll policy
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }
}
