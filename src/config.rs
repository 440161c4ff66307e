//! Configuration data shapes (spec §6.1). Parsing is the embedding
//! application's concern — this module only defines the shape so it can be
//! deserialized by whatever format crate the caller already uses (`toml`,
//! `serde_yaml`, ...). Nothing here reads a file or environment variable.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_max_reset_timeout() -> Duration {
    Duration::from_secs(3600)
}

/// Mirrors `BreakerConfig` as a wire/config shape (spec §6.1 `breaker` block).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfigSchema {
    pub failure_threshold: usize,
    pub reset_timeout: Duration,
    #[serde(default)]
    pub use_exponential_backoff: bool,
    #[serde(default = "default_max_reset_timeout")]
    pub max_reset_timeout: Duration,
}

impl From<BreakerConfigSchema> for crate::circuit::BreakerConfig {
    fn from(schema: BreakerConfigSchema) -> Self {
        let base = crate::circuit::BreakerConfig::new(schema.failure_threshold, schema.reset_timeout);
        if schema.use_exponential_backoff {
            base.with_exponential_backoff(schema.max_reset_timeout)
        } else {
            base
        }
    }
}

/// One entry of `orchestration.providers` (spec §6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfigEntry {
    pub name: String,
    pub priority: i32,
    pub enabled: bool,
    pub breaker: BreakerConfigSchema,
}

/// Top-level `orchestration` config block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    pub providers: Vec<ProviderConfigEntry>,
}

/// One entry of `multiKey.apiKeySecrets` (spec §6.1): a symbolic name, not
/// the secret value itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeySecretRef {
    pub secret_key: String,
    pub display_name: String,
}

fn default_rate_limit_cooldown() -> Duration {
    Duration::from_secs(3600)
}

fn default_quota_exceeded_cooldown() -> Duration {
    Duration::from_secs(86_400)
}

fn default_speaking_rate() -> f64 {
    1.0
}

fn default_sample_rate_hertz() -> i32 {
    24_000
}

/// Top-level `multiKey` config block (spec §6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiKeyConfigSchema {
    pub api_key_secrets: Vec<ApiKeySecretRef>,
    #[serde(default)]
    pub voice: Option<String>,
    pub audio_encoding: String,
    #[serde(default = "default_speaking_rate")]
    pub speaking_rate: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub volume_gain_db: f64,
    #[serde(default = "default_sample_rate_hertz")]
    pub sample_rate_hertz: i32,
    pub timeout: Duration,
    #[serde(default = "default_rate_limit_cooldown")]
    pub rate_limit_cooldown: Duration,
    #[serde(default = "default_quota_exceeded_cooldown")]
    pub quota_exceeded_cooldown: Duration,
}
