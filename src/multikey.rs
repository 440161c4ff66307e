//! Google Cloud TTS client that rotates among several API keys (spec §4.4).

use crate::clock::Clock;
use crate::error::{ChainError, ConfigError};
use crate::keypool::{KeyPool, DEFAULT_QUOTA_EXCEEDED_COOLDOWN, DEFAULT_RATE_LIMIT_COOLDOWN};
use crate::model::{AttemptRecord, AudioPayload, SynthesisRequest, SynthesisResult};
use crate::normalize::{self, DEFAULT_LANGUAGE_CODE};
use crate::provider::{Provider, ProviderInfo, ProviderStatus};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};
use tokio_util::sync::CancellationToken;

const ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    Mp3,
    Linear16,
    OggOpus,
}

impl AudioEncoding {
    fn wire_name(self) -> &'static str {
        match self {
            Self::Mp3 => "MP3",
            Self::Linear16 => "LINEAR16",
            Self::OggOpus => "OGG_OPUS",
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            _ => "audio/wav",
        }
    }
}

/// Static endpoint configuration shared across every key in the pool.
#[derive(Debug, Clone)]
pub struct MultiKeyConfig {
    pub voice: Option<String>,
    pub audio_encoding: AudioEncoding,
    pub speaking_rate_default: f64,
    pub sample_rate_hertz: i32,
    pub volume_gain_db: f64,
    pub rate_limit_cooldown: Duration,
    pub quota_exceeded_cooldown: Duration,
}

impl Default for MultiKeyConfig {
    fn default() -> Self {
        Self {
            voice: None,
            audio_encoding: AudioEncoding::Mp3,
            speaking_rate_default: 1.0,
            sample_rate_hertz: 24_000,
            volume_gain_db: 0.0,
            rate_limit_cooldown: DEFAULT_RATE_LIMIT_COOLDOWN,
            quota_exceeded_cooldown: DEFAULT_QUOTA_EXCEEDED_COOLDOWN,
        }
    }
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct VoiceSelectionParams<'a> {
    #[serde(rename = "languageCode")]
    language_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct AudioConfig {
    #[serde(rename = "audioEncoding")]
    audio_encoding: &'static str,
    #[serde(rename = "speakingRate")]
    speaking_rate: f64,
    pitch: f64,
    #[serde(rename = "volumeGainDb")]
    volume_gain_db: f64,
    #[serde(rename = "sampleRateHertz")]
    sample_rate_hertz: i32,
}

#[derive(Serialize)]
struct SynthesizeRequestBody<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelectionParams<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig,
}

#[derive(Deserialize, Default)]
struct SynthesizeResponseBody {
    #[serde(rename = "audioContent")]
    audio_content: Option<String>,
}

/// Pure classification of a non-2xx HTTP status into a key-state
/// transition, per spec §4.4.2. Split out from `synthesize` so the mapping
/// itself is unit-testable without a network round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusOutcome {
    RateLimited,
    QuotaExceeded,
    Invalid,
    TemporaryError,
}

fn classify_non_success_status(status: u16) -> StatusOutcome {
    match status {
        429 => StatusOutcome::RateLimited,
        403 => StatusOutcome::QuotaExceeded,
        401 => StatusOutcome::Invalid,
        _ => StatusOutcome::TemporaryError,
    }
}

/// A [`Provider`] that rotates among several Google Cloud TTS API keys.
pub struct MultiKeyClient {
    config: MultiKeyConfig,
    pool: KeyPool,
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
    last_success_time: Mutex<Option<SystemTime>>,
}

impl MultiKeyClient {
    /// Resolves `secrets` (symbolic name → display name) against `resolved`
    /// (symbolic name → actual secret value), failing construction if any
    /// name does not resolve.
    pub fn new(
        secrets: Vec<(String, String)>,
        resolved: &HashMap<String, String>,
        config: MultiKeyConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let mut keys = Vec::with_capacity(secrets.len());
        for (secret_key, display_name) in secrets {
            let value = resolved
                .get(&secret_key)
                .cloned()
                .ok_or_else(|| ConfigError::UnresolvedSecret(secret_key.clone()))?;
            keys.push((display_name, value));
        }
        if keys.is_empty() {
            return Err(ConfigError::NoKeysConfigured);
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(ConfigError::HttpClient)?;

        let pool = KeyPool::new(keys, config.rate_limit_cooldown, config.quota_exceeded_cooldown);

        Ok(Self { config, pool, http, clock, last_success_time: Mutex::new(None) })
    }

    /// Construct with an externally owned client (tests, or a shared pool in
    /// the embedding application).
    pub fn with_http_client(
        secrets: Vec<(String, String)>,
        resolved: &HashMap<String, String>,
        config: MultiKeyConfig,
        clock: Arc<dyn Clock>,
        http: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        let mut client = Self::new(secrets, resolved, config, clock)?;
        client.http = http;
        Ok(client)
    }

    fn build_body<'a>(&'a self, request: &'a SynthesisRequest) -> SynthesizeRequestBody<'a> {
        let voice = request.voice.as_deref().or(self.config.voice.as_deref());
        let language_code = voice
            .map(normalize::voice_language_code)
            .unwrap_or_else(|| DEFAULT_LANGUAGE_CODE.to_string());

        SynthesizeRequestBody {
            input: SynthesisInput { text: &request.text },
            voice: VoiceSelectionParams { language_code, name: voice },
            audio_config: AudioConfig {
                audio_encoding: self.config.audio_encoding.wire_name(),
                speaking_rate: normalize::rate_to_multiplier(
                    request.rate,
                    self.config.speaking_rate_default,
                ),
                pitch: normalize::pitch_to_semitones(request.pitch),
                volume_gain_db: self.config.volume_gain_db,
                sample_rate_hertz: self.config.sample_rate_hertz,
            },
        }
    }
}

#[async_trait]
impl Provider for MultiKeyClient {
    fn name(&self) -> &str {
        "google-cloud-tts"
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        cancellation: &CancellationToken,
    ) -> Result<SynthesisResult, ChainError> {
        let started = Instant::now();
        let body = self.build_body(request);
        let max_attempts = self.pool.len() + 1;
        let mut attempts = Vec::new();

        for _ in 0..max_attempts {
            let now = self.clock.now_millis();
            let key = match self.pool.next_available(now) {
                Some(key) => key,
                None => {
                    return Ok(SynthesisResult::failure("all API keys exhausted", attempts));
                }
            };

            if cancellation.is_cancelled() {
                return Err(ChainError::Cancelled);
            }

            let attempt_started = Instant::now();
            let response = tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(ChainError::Cancelled),
                result = self
                    .http
                    .post(ENDPOINT)
                    .query(&[("key", key.secret_value.as_str())])
                    .json(&body)
                    .send() => result,
            };

            let response = match response {
                Ok(response) => response,
                Err(err) => {
                    self.pool.mark_temporary_error(key.index, now);
                    attempts.push(AttemptRecord {
                        provider_name: key.display_name.clone(),
                        error_message: err.to_string(),
                        duration: attempt_started.elapsed(),
                    });
                    continue;
                }
            };

            let status = response.status();

            if status.is_success() {
                let parsed = response.json::<SynthesizeResponseBody>().await.ok().unwrap_or_default();
                match parsed.audio_content {
                    Some(encoded) => {
                        let bytes = match base64::engine::general_purpose::STANDARD.decode(encoded) {
                            Ok(bytes) => bytes,
                            Err(err) => {
                                return Ok(SynthesisResult::failure(
                                    format!("malformed audioContent: {err}"),
                                    attempts,
                                ));
                            }
                        };
                        *self.last_success_time.lock().expect("mutex poisoned") =
                            Some(SystemTime::now());
                        let payload = AudioPayload::Memory {
                            bytes,
                            content_type: self.config.audio_encoding.content_type().to_string(),
                        };
                        return Ok(SynthesisResult::success(
                            self.name(),
                            payload,
                            started.elapsed(),
                            None,
                            attempts,
                        ));
                    }
                    None => {
                        return Ok(SynthesisResult::failure(
                            "200 OK without audioContent".to_string(),
                            attempts,
                        ));
                    }
                }
            }

            let elapsed = attempt_started.elapsed();
            match classify_non_success_status(status.as_u16()) {
                StatusOutcome::RateLimited => self.pool.mark_rate_limited(key.index, now),
                StatusOutcome::QuotaExceeded => self.pool.mark_quota_exceeded(key.index, now),
                StatusOutcome::Invalid => self.pool.mark_invalid(key.index),
                StatusOutcome::TemporaryError => self.pool.mark_temporary_error(key.index, now),
            }

            attempts.push(AttemptRecord {
                provider_name: key.display_name.clone(),
                error_message: format!("http {status}"),
                duration: elapsed,
            });
        }

        Ok(SynthesisResult::failure("all API keys exhausted", attempts))
    }

    async fn info(&self) -> ProviderInfo {
        let now = self.clock.now_millis();
        let status = if self.pool.is_empty() {
            ProviderStatus::Unavailable
        } else if self.pool.has_available_or_recoverable(now) {
            ProviderStatus::Available
        } else {
            ProviderStatus::Degraded
        };

        ProviderInfo {
            name: self.name().to_string(),
            status,
            last_success_time: *self.last_success_time.lock().expect("mutex poisoned"),
            supported_voices: Vec::new(),
        }
    }
}
