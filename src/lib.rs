#![forbid(unsafe_code)]

//! # ttsmux
//!
//! Core of a multi-provider text-to-speech synthesis library: a
//! provider-chain orchestrator with per-provider circuit breakers, and a
//! multi-API-key Google Cloud TTS client that rotates keys on rate-limit,
//! quota, and auth errors.
//!
//! ## Features
//!
//! - Sequential fallback across an ordered list of backends, with per-request
//!   preferred-provider hoisting and fallback-chain overrides
//! - A three-state circuit breaker per provider, with optional exponential
//!   backoff, guarding the chain against a known-bad backend
//! - A rotating multi-key cloud client with independent per-key cooldowns,
//!   nested inside the chain as a single `Provider`
//! - Deterministic time injection (`Clock`) for testing breaker and cooldown
//!   transitions without real sleeps
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use ttsmux::{
//!     BreakerConfig, Clock, MonotonicClock, ProviderChain, ProviderEntry, ProviderRegistry,
//!     SynthesisRequest,
//! };
//! # use ttsmux::{AudioPayload, ChainError, Provider, ProviderInfo, ProviderStatus, SynthesisResult};
//! # use async_trait::async_trait;
//! #
//! # struct EchoProvider;
//! # #[async_trait]
//! # impl Provider for EchoProvider {
//! #     fn name(&self) -> &str { "echo" }
//! #     async fn synthesize(
//! #         &self,
//! #         _request: &SynthesisRequest,
//! #         _cancellation: &CancellationToken,
//! #     ) -> Result<SynthesisResult, ChainError> {
//! #         Ok(SynthesisResult::success(
//! #             "echo",
//! #             AudioPayload::Memory { bytes: vec![], content_type: "audio/mpeg".into() },
//! #             Duration::ZERO,
//! #             None,
//! #             vec![],
//! #         ))
//! #     }
//! #     async fn info(&self) -> ProviderInfo {
//! #         ProviderInfo {
//! #             name: "echo".into(),
//! #             status: ProviderStatus::Available,
//! #             last_success_time: None,
//! #             supported_voices: vec![],
//! #         }
//! #     }
//! # }
//!
//! #[tokio::main]
//! async fn main() {
//!     let entry = ProviderEntry::new(
//!         "echo",
//!         0,
//!         true,
//!         Arc::new(EchoProvider),
//!         BreakerConfig::new(5, Duration::from_secs(30)),
//!     );
//!     let registry = ProviderRegistry::new(vec![entry]);
//!     let chain = ProviderChain::new(registry, Arc::new(MonotonicClock::default()) as Arc<dyn Clock>);
//!
//!     let request = SynthesisRequest::new("hello world");
//!     let result = chain.synthesize(&request, &CancellationToken::new()).await.unwrap();
//!     assert!(result.success);
//! }
//! ```

mod chain;
mod circuit;
mod clock;
mod config;
mod error;
mod keypool;
mod model;
mod multikey;
mod normalize;
mod provider;
mod registry;

pub use chain::{ProviderChain, ProviderStatusSnapshot};
pub use circuit::{BreakerConfig, CircuitSnapshot, CircuitState, CircuitStatus, DISABLED_THRESHOLD};
pub use clock::{Clock, MonotonicClock, VirtualClock};
pub use config::{
    ApiKeySecretRef, BreakerConfigSchema, MultiKeyConfigSchema, OrchestrationConfig,
    ProviderConfigEntry,
};
pub use error::{ChainError, ConfigError, ValidationError};
pub use keypool::{KeyPool, KeySelection, KeyStatus};
pub use model::{AttemptRecord, AudioPayload, SynthesisRequest, SynthesisResult, MAX_TEXT_LEN};
pub use multikey::{AudioEncoding, MultiKeyClient, MultiKeyConfig};
pub use normalize::{
    pitch_to_hz_string, pitch_to_semitones, rate_to_multiplier, rate_to_percentage_string,
    voice_language_code, DEFAULT_LANGUAGE_CODE,
};
pub use provider::{Provider, ProviderInfo, ProviderStatus};
pub use registry::{ProviderEntry, ProviderRegistry};

pub mod prelude;
