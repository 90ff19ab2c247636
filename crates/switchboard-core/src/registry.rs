// crates/switchboard-core/src/registry.rs
// ============================================================================
// Module: Upstream Registry
// Description: Shared mapping from provider names to network locations.
// Purpose: Resolve providers on the request path without blocking on writes.
// Dependencies: std::sync
// ============================================================================

//! ## Overview
//! The upstream registry maps provider names to their network targets. It is
//! seeded at startup and may be extended administratively while serving;
//! registration is linearizable and request-path reads clone the target out
//! of a short read-locked critical section, so no lock is ever held across
//! network I/O.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::client::UpstreamTarget;
use crate::error::ProxyError;
use crate::identifiers::ProviderName;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Shared registry of upstream providers.
///
/// # Invariants
/// - Provider names are unique; re-registration overwrites silently.
/// - The inner lock guards map access only, never I/O.
#[derive(Debug, Default)]
pub struct UpstreamRegistry {
    /// Provider targets keyed by name.
    targets: RwLock<BTreeMap<ProviderName, UpstreamTarget>>,
}

impl UpstreamRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            targets: RwLock::new(BTreeMap::new()),
        }
    }

    /// Registers a provider target, replacing any previous registration.
    ///
    /// This is an administrative operation; it never runs on the caller
    /// request path.
    pub fn register(&self, name: ProviderName, target: UpstreamTarget) {
        let mut guard = self.targets.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.insert(name, target);
    }

    /// Resolves a provider to its registered target.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::UnknownProvider`] when the provider is absent.
    pub fn resolve(&self, name: &ProviderName) -> Result<UpstreamTarget, ProxyError> {
        let guard = self.targets.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.get(name).cloned().ok_or_else(|| ProxyError::UnknownProvider(name.clone()))
    }

    /// Returns the registered provider names in sorted order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<ProviderName> {
        let guard = self.targets.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.keys().cloned().collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
