//! The orchestrator: candidate selection, breaker checks, attempt accounting (spec §4.3).

use crate::circuit::CircuitStatus;
use crate::clock::Clock;
use crate::error::ChainError;
use crate::model::{AttemptRecord, SynthesisRequest, SynthesisResult};
use crate::registry::{ProviderEntry, ProviderRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Point-in-time snapshot of one provider's breaker, for diagnostics.
#[derive(Debug, Clone)]
pub struct ProviderStatusSnapshot {
    pub name: String,
    pub priority: i32,
    pub enabled: bool,
    pub circuit_status: CircuitStatus,
    pub open_until_millis: Option<u64>,
    pub consecutive_failures: usize,
}

/// The central sequencing orchestrator. Owns a [`ProviderRegistry`] and a
/// [`Clock`]; stateless beyond what those two already hold.
pub struct ProviderChain {
    registry: ProviderRegistry,
    clock: Arc<dyn Clock>,
}

impl ProviderChain {
    pub fn new(registry: ProviderRegistry, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// Attempt synthesis against the chain's providers in order, returning the
    /// first success or a composite failure describing every attempt.
    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
        cancellation: &CancellationToken,
    ) -> Result<SynthesisResult, ChainError> {
        let span = tracing::info_span!(
            "synthesize",
            preferred_provider = request.preferred_provider.as_deref().unwrap_or(""),
            agent_name = request.agent_name.as_deref().unwrap_or(""),
        );
        let _entered = span.enter();

        request.validate()?;

        let candidates = self.select_candidates(request);
        if candidates.is_empty() {
            return Ok(SynthesisResult::failure("No providers available", Vec::new()));
        }

        let mut attempts = Vec::new();

        for entry in &candidates {
            if cancellation.is_cancelled() {
                return Err(ChainError::Cancelled);
            }

            let now = self.clock.now_millis();
            if entry.circuit.observed_status(now) == CircuitStatus::Open {
                attempts.push(AttemptRecord {
                    provider_name: entry.name.clone(),
                    error_message: "circuit open".to_string(),
                    duration: Duration::ZERO,
                });
                continue;
            }

            let started = Instant::now();
            let outcome = entry.provider.synthesize(request, cancellation).await;
            let elapsed = started.elapsed();

            match outcome {
                Ok(result) if result.success => {
                    entry.circuit.record_success();
                    let mut result = result;
                    attempts.append(&mut result.attempts);
                    result.attempts = attempts;
                    return Ok(result);
                }
                Ok(result) => {
                    entry.circuit.record_failure(now);
                    let message =
                        result.error_message.unwrap_or_else(|| "no audio".to_string());
                    attempts.push(AttemptRecord {
                        provider_name: entry.name.clone(),
                        error_message: message,
                        duration: elapsed,
                    });
                }
                Err(ChainError::Cancelled) => {
                    return Err(ChainError::Cancelled);
                }
                Err(err) => {
                    entry.circuit.record_failure(now);
                    attempts.push(AttemptRecord {
                        provider_name: entry.name.clone(),
                        error_message: err.to_string(),
                        duration: elapsed,
                    });
                }
            }
        }

        let count = attempts.len();
        Ok(SynthesisResult::failure(format!("All {count} providers failed"), attempts))
    }

    /// Pure, lock-consistent snapshot of every registered provider's breaker.
    pub fn providers_status(&self) -> Vec<ProviderStatusSnapshot> {
        let now = self.clock.now_millis();
        self.registry
            .all_in_priority_order()
            .into_iter()
            .map(|entry| {
                let snap = entry.circuit.snapshot(now);
                ProviderStatusSnapshot {
                    name: entry.name.clone(),
                    priority: entry.priority,
                    enabled: entry.enabled,
                    circuit_status: snap.status,
                    open_until_millis: snap.open_until_millis,
                    consecutive_failures: snap.consecutive_failures,
                }
            })
            .collect()
    }

    fn select_candidates(&self, request: &SynthesisRequest) -> Vec<Arc<ProviderEntry>> {
        let mut candidates = if !request.fallback_chain.is_empty() {
            let filtered: Vec<Arc<ProviderEntry>> = request
                .fallback_chain
                .iter()
                .filter_map(|name| match self.registry.get(name) {
                    Some(entry) if entry.enabled => Some(entry),
                    Some(_) => {
                        tracing::warn!(provider = %name, "fallback chain entry disabled, dropping");
                        None
                    }
                    None => {
                        tracing::warn!(provider = %name, "fallback chain entry unknown, dropping");
                        None
                    }
                })
                .collect();
            if filtered.is_empty() {
                self.registry.enabled_in_priority_order()
            } else {
                filtered
            }
        } else {
            self.registry.enabled_in_priority_order()
        };

        if let Some(preferred) = &request.preferred_provider {
            let position = candidates.iter().position(|e| e.name.eq_ignore_ascii_case(preferred));
            match position {
                Some(idx) if idx > 0 => {
                    let entry = candidates.remove(idx);
                    candidates.insert(0, entry);
                }
                Some(_) => {}
                None => {
                    tracing::warn!(preferred_provider = %preferred, "preferred provider not found among candidates");
                }
            }
        }

        candidates
    }
}
