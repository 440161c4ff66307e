//! Convenient re-exports for common ttsmux types.
pub use crate::{
    AttemptRecord, AudioPayload, BreakerConfig, ChainError, Clock, MonotonicClock, MultiKeyClient,
    MultiKeyConfig, Provider, ProviderChain, ProviderEntry, ProviderInfo, ProviderRegistry,
    ProviderStatus, SynthesisRequest, SynthesisResult, VirtualClock,
};
