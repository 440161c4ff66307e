//! Request/result value objects (spec §3).

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Maximum accepted request text length, after trimming.
pub const MAX_TEXT_LEN: usize = 10_000;

/// Input to [`crate::chain::ProviderChain::synthesize`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub rate: i32,
    #[serde(default)]
    pub pitch: i32,
    #[serde(default)]
    pub preferred_provider: Option<String>,
    #[serde(default)]
    pub fallback_chain: Vec<String>,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub agent_instance_id: Option<String>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    /// Validate the request per spec §3's invariant. Returns the trimmed text
    /// on success.
    pub fn validate(&self) -> Result<String, ValidationError> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        if trimmed.chars().count() > MAX_TEXT_LEN {
            return Err(ValidationError::TextTooLong {
                max: MAX_TEXT_LEN,
                actual: trimmed.chars().count(),
            });
        }
        if !(-100..=100).contains(&self.rate) {
            return Err(ValidationError::RateOutOfRange(self.rate));
        }
        if !(-100..=100).contains(&self.pitch) {
            return Err(ValidationError::PitchOutOfRange(self.pitch));
        }
        Ok(trimmed.to_string())
    }
}

/// Synthesized audio, either held in memory or already written to disk by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioPayload {
    Memory { bytes: Vec<u8>, content_type: String },
    File { path: PathBuf, content_type: String },
}

/// One provider's attempt during a request, recorded whether it failed or was skipped.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub provider_name: String,
    pub error_message: String,
    pub duration: Duration,
}

/// Output of [`crate::chain::ProviderChain::synthesize`].
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub success: bool,
    pub audio: Option<AudioPayload>,
    pub provider_used: Option<String>,
    pub generation_time: Duration,
    pub audio_duration: Option<Duration>,
    pub error_message: Option<String>,
    pub attempts: Vec<AttemptRecord>,
}

impl SynthesisResult {
    pub fn success(
        provider_used: impl Into<String>,
        audio: AudioPayload,
        generation_time: Duration,
        audio_duration: Option<Duration>,
        attempts: Vec<AttemptRecord>,
    ) -> Self {
        Self {
            success: true,
            audio: Some(audio),
            provider_used: Some(provider_used.into()),
            generation_time,
            audio_duration,
            error_message: None,
            attempts,
        }
    }

    pub fn failure(error_message: impl Into<String>, attempts: Vec<AttemptRecord>) -> Self {
        let generation_time = attempts.iter().map(|a| a.duration).sum();
        Self {
            success: false,
            audio: None,
            provider_used: None,
            generation_time,
            audio_duration: None,
            error_message: Some(error_message.into()),
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_text() {
        let req = SynthesisRequest::new("   ");
        assert_eq!(req.validate(), Err(ValidationError::EmptyText));
    }

    #[test]
    fn rejects_text_over_max_length() {
        let req = SynthesisRequest::new("x".repeat(MAX_TEXT_LEN + 1));
        assert_eq!(
            req.validate(),
            Err(ValidationError::TextTooLong { max: MAX_TEXT_LEN, actual: MAX_TEXT_LEN + 1 })
        );
    }

    #[test]
    fn trims_and_accepts_valid_text() {
        let req = SynthesisRequest::new("  hello world  ");
        assert_eq!(req.validate().unwrap(), "hello world");
    }

    #[test]
    fn rejects_out_of_range_rate_and_pitch() {
        let mut req = SynthesisRequest::new("hi");
        req.rate = 101;
        assert_eq!(req.validate(), Err(ValidationError::RateOutOfRange(101)));

        let mut req = SynthesisRequest::new("hi");
        req.pitch = -101;
        assert_eq!(req.validate(), Err(ValidationError::PitchOutOfRange(-101)));
    }

    #[test]
    fn failure_result_sums_attempt_durations() {
        let attempts = vec![
            AttemptRecord {
                provider_name: "a".into(),
                error_message: "e1".into(),
                duration: Duration::from_millis(10),
            },
            AttemptRecord {
                provider_name: "b".into(),
                error_message: "e2".into(),
                duration: Duration::from_millis(25),
            },
        ];
        let result = SynthesisResult::failure("All 2 providers failed", attempts);
        assert!(!result.success);
        assert_eq!(result.generation_time, Duration::from_millis(35));
        assert_eq!(result.attempts.len(), 2);
    }
}
