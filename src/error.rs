//! Unified error taxonomy for the provider chain and multi-key client.
//!
//! One variant per error kind in the spec's propagation table: validation
//! failures and `ConfigFatal` surface immediately to the caller; circuit-open
//! skips, provider failures/faults, and key exhaustion are handled locally by
//! trying the next candidate and only ever show up inside an
//! [`crate::model::AttemptRecord`].

use std::time::Duration;
use thiserror::Error;

/// Errors produced while validating a [`crate::model::SynthesisRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("text must not be empty")]
    EmptyText,
    #[error("text exceeds maximum length of {max} characters (got {actual})")]
    TextTooLong { max: usize, actual: usize },
    #[error("rate {0} out of range [-100, 100]")]
    RateOutOfRange(i32),
    #[error("pitch {0} out of range [-100, 100]")]
    PitchOutOfRange(i32),
}

/// Errors raised when a [`crate::multikey::MultiKeyClient`] fails to construct.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("api key secret '{0}' did not resolve to a value")]
    UnresolvedSecret(String),
    #[error("no api key secrets configured")]
    NoKeysConfigured,
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Unified error type returned by [`crate::chain::ProviderChain::synthesize`]
/// and by [`crate::provider::Provider::synthesize`] implementations.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The request failed validation before any provider was touched.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// A provider ran and returned `success = false`.
    #[error("provider '{provider}' failed: {message}")]
    ProviderFailure { provider: String, message: String },

    /// A provider raised an unexpected fault instead of returning a typed failure.
    #[error("provider '{provider}' faulted: {message}")]
    ProviderFault { provider: String, message: String },

    /// The candidate's breaker was open; it was skipped, not invoked.
    #[error("circuit open for provider '{provider}' ({failure_count} failures, open for {open_duration:?})")]
    CircuitOpen { provider: String, failure_count: usize, open_duration: Duration },

    /// An external cancellation signal fired during provider invocation.
    #[error("synthesis cancelled")]
    Cancelled,

    /// The multi-key client exhausted every configured API key.
    #[error("all API keys exhausted")]
    KeyExhausted,

    /// The multi-key client could not be constructed (bad secret, empty pool, client build failure).
    #[error("multi-key client configuration error: {0}")]
    ConfigFatal(#[from] ConfigError),

    /// No candidate providers remained after filtering.
    #[error("No providers available")]
    NoProvidersAvailable,

    /// All candidates were tried and all failed.
    #[error("All {0} providers failed")]
    AllProvidersFailed(usize),
}

impl ChainError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::ProviderFailure { .. })
    }

    pub fn is_provider_fault(&self) -> bool {
        matches!(self, Self::ProviderFault { .. })
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_key_exhausted(&self) -> bool {
        matches!(self, Self::KeyExhausted)
    }

    pub fn is_config_fatal(&self) -> bool {
        matches!(self, Self::ConfigFatal(_))
    }

    pub fn is_no_providers_available(&self) -> bool {
        matches!(self, Self::NoProvidersAvailable)
    }

    /// Recoverable errors are handled locally by the chain (try the next
    /// candidate/key); everything else surfaces immediately to the caller.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ProviderFailure { .. }
                | Self::ProviderFault { .. }
                | Self::CircuitOpen { .. }
                | Self::KeyExhausted
        )
    }
}
