//! Name → provider lookup (spec §4.5).
//!
//! Immutable after construction; built once from the enabled configuration
//! entries the caller hands in. Lookups are case-insensitive. Membership
//! here does not imply "enabled" — that bit lives on each entry and is
//! re-checked by the chain on every request.

use crate::circuit::{BreakerConfig, CircuitState};
use crate::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;

/// Static wiring for one provider (spec §3 `ProviderConfig`).
pub struct ProviderEntry {
    pub name: String,
    pub priority: i32,
    pub enabled: bool,
    pub provider: Arc<dyn Provider>,
    pub circuit: Arc<CircuitState>,
}

impl ProviderEntry {
    pub fn new(
        name: impl Into<String>,
        priority: i32,
        enabled: bool,
        provider: Arc<dyn Provider>,
        breaker: BreakerConfig,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            enabled,
            provider,
            circuit: Arc::new(CircuitState::new(breaker)),
        }
    }
}

/// Immutable name→provider mapping, built once at chain construction.
pub struct ProviderRegistry {
    by_lowercase_name: HashMap<String, Arc<ProviderEntry>>,
    /// Stable priority order (ascending), computed once.
    priority_order: Vec<Arc<ProviderEntry>>,
}

impl ProviderRegistry {
    pub fn new(entries: Vec<ProviderEntry>) -> Self {
        let entries: Vec<Arc<ProviderEntry>> = entries.into_iter().map(Arc::new).collect();

        let mut by_lowercase_name = HashMap::with_capacity(entries.len());
        for entry in &entries {
            by_lowercase_name.insert(entry.name.to_lowercase(), Arc::clone(entry));
        }

        let mut priority_order = entries;
        priority_order.sort_by_key(|e| e.priority);

        Self { by_lowercase_name, priority_order }
    }

    /// Case-insensitive lookup by name.
    pub fn get(&self, name: &str) -> Option<Arc<ProviderEntry>> {
        self.by_lowercase_name.get(&name.to_lowercase()).cloned()
    }

    /// Enabled providers in ascending priority order.
    pub fn enabled_in_priority_order(&self) -> Vec<Arc<ProviderEntry>> {
        self.priority_order.iter().filter(|e| e.enabled).cloned().collect()
    }

    /// Every registered provider (enabled or not) in ascending priority
    /// order, for diagnostic enumeration (`providers_status`).
    pub fn all_in_priority_order(&self) -> Vec<Arc<ProviderEntry>> {
        self.priority_order.clone()
    }

    pub fn len(&self) -> usize {
        self.priority_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.priority_order.is_empty()
    }
}
