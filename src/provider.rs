//! The boundary contract adapters must satisfy (spec §6.3).

use crate::error::ChainError;
use crate::model::{SynthesisRequest, SynthesisResult};
use async_trait::async_trait;
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Available,
    Unavailable,
    Degraded,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub name: String,
    pub status: ProviderStatus,
    pub last_success_time: Option<SystemTime>,
    pub supported_voices: Vec<String>,
}

/// A backend TTS adapter. Implementations must never panic on an expected
/// failure (network error, auth error) — return `Err(ChainError::ProviderFailure)`
/// instead so the chain can fall back. Unexpected panics/raises are still
/// classified as faults by the chain's caller, but a well-behaved adapter
/// should not rely on that.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, case-insensitive unique across the registry.
    fn name(&self) -> &str;

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        cancellation: &CancellationToken,
    ) -> Result<SynthesisResult, ChainError>;

    async fn info(&self) -> ProviderInfo;
}
