//! Per-API-key state machine used by [`crate::multikey::MultiKeyClient`] (spec §4.4.1).

use std::sync::Mutex;
use std::time::Duration;

pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_QUOTA_EXCEEDED_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);
const TEMPORARY_ERROR_COOLDOWN: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Available,
    RateLimited,
    QuotaExceeded,
    Invalid,
    TemporaryError,
}

struct KeySlot {
    display_name: String,
    secret_value: String,
    state: KeyStatus,
    cooldown_until_millis: Option<u64>,
}

/// A key handed out by [`KeyPool::next_available`], identified by its index
/// into the pool so the caller can report back what happened to it.
#[derive(Debug, Clone)]
pub struct KeySelection {
    pub index: usize,
    pub display_name: String,
    pub secret_value: String,
}

pub struct KeyPool {
    rate_limit_cooldown: Duration,
    quota_exceeded_cooldown: Duration,
    slots: Mutex<Vec<KeySlot>>,
}

impl KeyPool {
    pub fn new(
        keys: Vec<(String, String)>,
        rate_limit_cooldown: Duration,
        quota_exceeded_cooldown: Duration,
    ) -> Self {
        let slots = keys
            .into_iter()
            .map(|(display_name, secret_value)| KeySlot {
                display_name,
                secret_value,
                state: KeyStatus::Available,
                cooldown_until_millis: None,
            })
            .collect();
        Self { rate_limit_cooldown, quota_exceeded_cooldown, slots: Mutex::new(slots) }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().expect("key pool mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Walk the pool in index order, skipping `Invalid` keys. Return the
    /// first `Available` key, or else the first whose cooldown has expired
    /// (promoting it to `Available` in the process).
    pub fn next_available(&self, now_millis: u64) -> Option<KeySelection> {
        let mut slots = self.slots.lock().expect("key pool mutex poisoned");

        if let Some((index, slot)) =
            slots.iter().enumerate().find(|(_, s)| s.state == KeyStatus::Available)
        {
            return Some(KeySelection {
                index,
                display_name: slot.display_name.clone(),
                secret_value: slot.secret_value.clone(),
            });
        }

        let expired = slots.iter().enumerate().find(|(_, s)| {
            s.state != KeyStatus::Invalid
                && s.cooldown_until_millis.map(|t| now_millis >= t).unwrap_or(false)
        });

        if let Some((index, _)) = expired {
            let slot = &mut slots[index];
            slot.state = KeyStatus::Available;
            slot.cooldown_until_millis = None;
            return Some(KeySelection {
                index,
                display_name: slot.display_name.clone(),
                secret_value: slot.secret_value.clone(),
            });
        }

        None
    }

    pub fn mark_rate_limited(&self, index: usize, now_millis: u64) {
        self.transition(index, KeyStatus::RateLimited, Some(now_millis + self.rate_limit_cooldown.as_millis() as u64));
    }

    pub fn mark_quota_exceeded(&self, index: usize, now_millis: u64) {
        self.transition(
            index,
            KeyStatus::QuotaExceeded,
            Some(now_millis + self.quota_exceeded_cooldown.as_millis() as u64),
        );
    }

    pub fn mark_invalid(&self, index: usize) {
        self.transition(index, KeyStatus::Invalid, None);
    }

    pub fn mark_temporary_error(&self, index: usize, now_millis: u64) {
        self.transition(
            index,
            KeyStatus::TemporaryError,
            Some(now_millis + TEMPORARY_ERROR_COOLDOWN.as_millis() as u64),
        );
    }

    fn transition(&self, index: usize, state: KeyStatus, cooldown_until_millis: Option<u64>) {
        let mut slots = self.slots.lock().expect("key pool mutex poisoned");
        if let Some(slot) = slots.get_mut(index) {
            tracing::warn!(key = %slot.display_name, ?state, "api key state transition");
            slot.state = state;
            slot.cooldown_until_millis = cooldown_until_millis;
        }
    }

    /// True if at least one key is `Available` right now, or any
    /// non-`Invalid` key's cooldown has already expired.
    pub fn has_available_or_recoverable(&self, now_millis: u64) -> bool {
        let slots = self.slots.lock().expect("key pool mutex poisoned");
        slots.iter().any(|s| {
            s.state == KeyStatus::Available
                || (s.state != KeyStatus::Invalid
                    && s.cooldown_until_millis.map(|t| now_millis >= t).unwrap_or(false))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> KeyPool {
        let keys = (0..n).map(|i| (format!("key{i}"), format!("secret{i}"))).collect();
        KeyPool::new(keys, Duration::from_secs(3600), Duration::from_secs(86_400))
    }

    #[test]
    fn selects_first_available_key_in_order() {
        let pool = pool(3);
        let selected = pool.next_available(0).unwrap();
        assert_eq!(selected.index, 0);
    }

    #[test]
    fn rate_limited_key_is_skipped_until_cooldown_expires() {
        let pool = pool(2);
        let first = pool.next_available(0).unwrap();
        pool.mark_rate_limited(first.index, 0);

        let second = pool.next_available(0).unwrap();
        assert_eq!(second.index, 1);

        // Both keys exhausted now; before cooldown, nothing available.
        pool.mark_rate_limited(second.index, 0);
        assert!(pool.next_available(100).is_none());

        // After cooldown elapses, key 0 becomes available again.
        let recovered = pool.next_available(3600 * 1000).unwrap();
        assert_eq!(recovered.index, 0);
    }

    #[test]
    fn invalid_key_is_never_reused() {
        let pool = pool(1);
        let key = pool.next_available(0).unwrap();
        pool.mark_invalid(key.index);
        assert!(pool.next_available(0).is_none());
        assert!(pool.next_available(u64::MAX).is_none(), "Invalid is terminal, no cooldown escape");
    }

    #[test]
    fn quota_exceeded_uses_its_own_longer_cooldown() {
        let pool = pool(1);
        let key = pool.next_available(0).unwrap();
        pool.mark_quota_exceeded(key.index, 0);
        assert!(pool.next_available(3600 * 1000).is_none(), "rate-limit cooldown shouldn't apply");
        assert!(pool.next_available(86_400 * 1000).is_some());
    }

    #[test]
    fn temporary_error_has_a_short_five_second_cooldown() {
        let pool = pool(1);
        let key = pool.next_available(0).unwrap();
        pool.mark_temporary_error(key.index, 1_000);
        assert!(pool.next_available(5_999).is_none());
        assert!(pool.next_available(6_000).is_some());
    }

    #[test]
    fn has_available_or_recoverable_reflects_cooldowns() {
        let pool = pool(1);
        assert!(pool.has_available_or_recoverable(0));
        let key = pool.next_available(0).unwrap();
        pool.mark_rate_limited(key.index, 0);
        assert!(!pool.has_available_or_recoverable(0));
        assert!(pool.has_available_or_recoverable(3_600_000));
    }
}
