//! End-to-end scenarios against the public API, mirroring the literal
//! examples worked through in the design notes (S1-S3 breaker behavior,
//! S4-S5 candidate ordering).

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use ttsmux::{
    AudioPayload, BreakerConfig, ChainError, Provider, ProviderChain, ProviderEntry, ProviderInfo,
    ProviderRegistry, ProviderStatus, SynthesisRequest, SynthesisResult, VirtualClock,
};

struct ScriptedProvider {
    name: &'static str,
    succeeds: AtomicUsize,
    success_from_call: usize,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn always_fails(name: &'static str) -> Self {
        Self { name, succeeds: AtomicUsize::new(0), success_from_call: usize::MAX, calls: AtomicUsize::new(0) }
    }

    fn always_succeeds(name: &'static str) -> Self {
        Self { name, succeeds: AtomicUsize::new(0), success_from_call: 0, calls: AtomicUsize::new(0) }
    }

    fn succeeds_from_call(name: &'static str, n: usize) -> Self {
        Self { name, succeeds: AtomicUsize::new(0), success_from_call: n, calls: AtomicUsize::new(0) }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn synthesize(
        &self,
        _request: &SynthesisRequest,
        _cancellation: &CancellationToken,
    ) -> Result<SynthesisResult, ChainError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.succeeds.fetch_add(1, Ordering::SeqCst);
        if call >= self.success_from_call {
            Ok(SynthesisResult::success(
                self.name,
                AudioPayload::Memory { bytes: vec![9], content_type: "audio/mpeg".into() },
                Duration::from_millis(1),
                None,
                Vec::new(),
            ))
        } else {
            Ok(SynthesisResult::failure(format!("{} down", self.name), Vec::new()))
        }
    }

    async fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name.to_string(),
            status: ProviderStatus::Available,
            last_success_time: None,
            supported_voices: vec![],
        }
    }
}

fn chain_with(
    entries: Vec<(&'static str, i32, Arc<ScriptedProvider>, BreakerConfig)>,
) -> (ProviderChain, Arc<VirtualClock>) {
    let clock = Arc::new(VirtualClock::new());
    let entries: Vec<ProviderEntry> = entries
        .into_iter()
        .map(|(name, priority, provider, breaker)| ProviderEntry::new(name, priority, true, provider, breaker))
        .collect();
    (ProviderChain::new(ProviderRegistry::new(entries), clock.clone() as Arc<dyn ttsmux::Clock>), clock)
}

/// S1 — threshold = 2, no exponential backoff: P always fails, Q always
/// succeeds; after two failing calls P's breaker opens and a third call
/// skips it with a zero-duration "circuit open" attempt record.
#[tokio::test]
async fn s1_threshold_opens_breaker_after_two_consecutive_failures() {
    let p = Arc::new(ScriptedProvider::always_fails("P"));
    let q = Arc::new(ScriptedProvider::always_succeeds("Q"));
    let (chain, _clock) = chain_with(vec![
        ("P", 1, p.clone(), BreakerConfig::new(2, Duration::from_secs(300))),
        ("Q", 2, q.clone(), BreakerConfig::new(2, Duration::from_secs(300))),
    ]);
    let request = SynthesisRequest::new("hello");
    let token = CancellationToken::new();

    let r1 = chain.synthesize(&request, &token).await.unwrap();
    assert_eq!(r1.provider_used.as_deref(), Some("Q"));
    assert_eq!(r1.attempts.len(), 1);

    let r2 = chain.synthesize(&request, &token).await.unwrap();
    assert_eq!(r2.provider_used.as_deref(), Some("Q"));
    assert_eq!(p.call_count(), 2, "breaker opens exactly at threshold=2");

    let r3 = chain.synthesize(&request, &token).await.unwrap();
    assert_eq!(r3.attempts[0].error_message, "circuit open");
    assert_eq!(r3.attempts[0].duration, Duration::ZERO);
    assert_eq!(p.call_count(), 2, "open breaker is skipped, not invoked");
}

/// S2 — HalfOpen recovery: once the reset timeout elapses the breaker is
/// observed HalfOpen and the next call is attempted; success closes it.
#[tokio::test]
async fn s2_half_open_trial_succeeds_and_closes_breaker() {
    let p = Arc::new(ScriptedProvider::succeeds_from_call("P", 2));
    let q = Arc::new(ScriptedProvider::always_succeeds("Q"));
    let (chain, clock) = chain_with(vec![
        ("P", 1, p.clone(), BreakerConfig::new(2, Duration::from_secs(300))),
        ("Q", 2, q.clone(), BreakerConfig::new(2, Duration::from_secs(300))),
    ]);
    let request = SynthesisRequest::new("hello");
    let token = CancellationToken::new();

    chain.synthesize(&request, &token).await.unwrap();
    chain.synthesize(&request, &token).await.unwrap();
    assert_eq!(p.call_count(), 2, "two failures open P's breaker");

    clock.advance(300_001);
    let recovered = chain.synthesize(&request, &token).await.unwrap();
    assert_eq!(recovered.provider_used.as_deref(), Some("P"));
    assert!(recovered.attempts.is_empty(), "half-open trial succeeded on first try");
}

/// S3 — exponential backoff doubles the reopen timeout each cycle, capped at max.
#[tokio::test]
async fn s3_exponential_backoff_doubles_each_reopen() {
    let p = Arc::new(ScriptedProvider::always_fails("P"));
    let q = Arc::new(ScriptedProvider::always_succeeds("Q"));
    let breaker = BreakerConfig::new(2, Duration::from_secs(60)).with_exponential_backoff(Duration::from_secs(3600));
    let (chain, clock) =
        chain_with(vec![("P", 1, p.clone(), breaker.clone()), ("Q", 2, q.clone(), breaker)]);
    let request = SynthesisRequest::new("hello");
    let token = CancellationToken::new();

    chain.synthesize(&request, &token).await.unwrap();
    chain.synthesize(&request, &token).await.unwrap();
    // First open: 60s.
    clock.advance(60_001);
    chain.synthesize(&request, &token).await.unwrap(); // half-open trial fails, reopens at x2
    assert_eq!(p.call_count(), 3);
    clock.advance(120_001);
    chain.synthesize(&request, &token).await.unwrap(); // half-open trial fails, reopens at x4
    assert_eq!(p.call_count(), 4);

    // Not yet elapsed at the x2 timeout (120s) from the second open: still open.
    clock.advance(1);
    let still_open = chain.synthesize(&request, &token).await.unwrap();
    assert_eq!(still_open.attempts[0].error_message, "circuit open");
}

/// S4 — preferred provider hoisting: the non-preferred candidate is never invoked.
#[tokio::test]
async fn s4_preferred_provider_is_tried_first_and_only() {
    let high = Arc::new(ScriptedProvider::always_succeeds("HighPri"));
    let low = Arc::new(ScriptedProvider::always_succeeds("LowPri"));
    let (chain, _clock) = chain_with(vec![
        ("HighPri", 1, high.clone(), BreakerConfig::new(5, Duration::from_secs(30))),
        ("LowPri", 2, low.clone(), BreakerConfig::new(5, Duration::from_secs(30))),
    ]);

    let mut request = SynthesisRequest::new("hello");
    request.preferred_provider = Some("LowPri".to_string());
    let result = chain.synthesize(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(result.provider_used.as_deref(), Some("LowPri"));
    assert_eq!(high.call_count(), 0);
}

/// S5 — fallback chain override, including silently dropping an unknown name.
#[tokio::test]
async fn s5_fallback_chain_overrides_default_order_and_drops_unknown_entries() {
    let high = Arc::new(ScriptedProvider::always_succeeds("HighPri"));
    let low = Arc::new(ScriptedProvider::always_succeeds("LowPri"));
    let (chain, _clock) = chain_with(vec![
        ("HighPri", 1, high.clone(), BreakerConfig::new(5, Duration::from_secs(30))),
        ("LowPri", 2, low.clone(), BreakerConfig::new(5, Duration::from_secs(30))),
    ]);

    let mut request = SynthesisRequest::new("hello");
    request.fallback_chain = vec!["Unknown".to_string(), "HighPri".to_string()];
    let result = chain.synthesize(&request, &CancellationToken::new()).await.unwrap();
    assert_eq!(result.provider_used.as_deref(), Some("HighPri"));
}

/// `fallbackChain` and `preferredProvider` combined: the hoist applies to
/// whichever candidate list was produced, fallback-chain override included.
#[tokio::test]
async fn preferred_provider_hoists_within_a_fallback_chain_override() {
    let high = Arc::new(ScriptedProvider::always_succeeds("HighPri"));
    let low = Arc::new(ScriptedProvider::always_succeeds("LowPri"));
    let third = Arc::new(ScriptedProvider::always_succeeds("Third"));
    let (chain, _clock) = chain_with(vec![
        ("HighPri", 1, high.clone(), BreakerConfig::new(5, Duration::from_secs(30))),
        ("LowPri", 2, low.clone(), BreakerConfig::new(5, Duration::from_secs(30))),
        ("Third", 3, third.clone(), BreakerConfig::new(5, Duration::from_secs(30))),
    ]);

    let mut request = SynthesisRequest::new("hello");
    request.fallback_chain = vec!["HighPri".to_string(), "LowPri".to_string(), "Third".to_string()];
    request.preferred_provider = Some("Third".to_string());
    let result = chain.synthesize(&request, &CancellationToken::new()).await.unwrap();

    assert_eq!(result.provider_used.as_deref(), Some("Third"));
    assert_eq!(high.call_count(), 0);
    assert_eq!(low.call_count(), 0);
}

/// Invariant 12: total providers tried never exceeds the candidate count.
#[tokio::test]
async fn total_attempts_never_exceed_candidate_count() {
    let p = Arc::new(ScriptedProvider::always_fails("P"));
    let q = Arc::new(ScriptedProvider::always_fails("Q"));
    let (chain, _clock) = chain_with(vec![
        ("P", 1, p.clone(), BreakerConfig::new(5, Duration::from_secs(30))),
        ("Q", 2, q.clone(), BreakerConfig::new(5, Duration::from_secs(30))),
    ]);
    let request = SynthesisRequest::new("hello");
    let result = chain.synthesize(&request, &CancellationToken::new()).await.unwrap();
    assert_eq!(result.attempts.len(), 2);
    assert!(!result.success);
}

/// Invariant 9: a cancellation observed mid-chain leaves the breaker untouched.
#[tokio::test]
async fn cancellation_does_not_record_a_circuit_failure() {
    struct CancellingProvider;

    #[async_trait]
    impl Provider for CancellingProvider {
        fn name(&self) -> &str {
            "cancelling"
        }

        async fn synthesize(
            &self,
            _request: &SynthesisRequest,
            cancellation: &CancellationToken,
        ) -> Result<SynthesisResult, ChainError> {
            cancellation.cancel();
            Err(ChainError::Cancelled)
        }

        async fn info(&self) -> ProviderInfo {
            ProviderInfo {
                name: "cancelling".to_string(),
                status: ProviderStatus::Available,
                last_success_time: None,
                supported_voices: vec![],
            }
        }
    }

    let clock = Arc::new(VirtualClock::new());
    let entry = ProviderEntry::new(
        "cancelling",
        0,
        true,
        Arc::new(CancellingProvider),
        BreakerConfig::new(1, Duration::from_secs(30)),
    );
    let registry = ProviderRegistry::new(vec![entry]);
    let chain = ProviderChain::new(registry, clock.clone() as Arc<dyn ttsmux::Clock>);

    let request = SynthesisRequest::new("hello");
    let err = chain.synthesize(&request, &CancellationToken::new()).await.unwrap_err();
    assert!(err.is_cancelled());

    let statuses = chain.providers_status();
    assert_eq!(statuses[0].consecutive_failures, 0, "cancellation must not count as a breaker failure");
}
