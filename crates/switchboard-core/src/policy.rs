// crates/switchboard-core/src/policy.rs
// ============================================================================
// Module: Caller Policy Store
// Description: Per-caller ordered grants of provider tool sets.
// Purpose: Decide tool visibility and invocation eligibility, deny by default.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A caller's policy is an ordered list of grants, each naming one provider
//! and the tools allowed from it. Order is priority: when two granted
//! providers expose the same bare tool name, the earlier grant wins both in
//! listings and in routing. A caller with no configured policy has access to
//! nothing; absence of configuration is a deny, never an allow.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;

use crate::identifiers::CallerId;
use crate::identifiers::ProviderName;

// ============================================================================
// SECTION: Tool Specifiers
// ============================================================================

/// Tools allowed from one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolSpecifier {
    /// Every tool the provider exposes; serialized as the `"*"` sentinel.
    All,
    /// An explicit set of bare tool names.
    Named(BTreeSet<String>),
}

impl ToolSpecifier {
    /// Returns true when the specifier admits the given bare tool name.
    #[must_use]
    pub fn admits(&self, bare_name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(names) => names.contains(bare_name),
        }
    }
}

impl Serialize for ToolSpecifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_str("*"),
            Self::Named(names) => names.serialize(serializer),
        }
    }
}

/// Wire representation accepted for a tool specifier.
#[derive(Deserialize)]
#[serde(untagged)]
enum ToolSpecifierRepr {
    /// The `"*"` sentinel (any other string is rejected).
    Sentinel(String),
    /// Explicit tool name set.
    Named(BTreeSet<String>),
}

impl<'de> Deserialize<'de> for ToolSpecifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ToolSpecifierRepr::deserialize(deserializer)? {
            ToolSpecifierRepr::Sentinel(raw) if raw == "*" => Ok(Self::All),
            ToolSpecifierRepr::Sentinel(raw) => Err(serde::de::Error::custom(format!(
                "expected \"*\" or a list of tool names, got \"{raw}\""
            ))),
            ToolSpecifierRepr::Named(names) => Ok(Self::Named(names)),
        }
    }
}

// ============================================================================
// SECTION: Policy Entries
// ============================================================================

/// One grant: a provider and the tools allowed from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    /// Granted provider.
    pub provider: ProviderName,
    /// Tools allowed from the provider.
    pub tools: ToolSpecifier,
}

// ============================================================================
// SECTION: Policy Table
// ============================================================================

/// Mapping from caller to its ordered grants.
///
/// # Invariants
/// - Within one caller's grants, each provider appears at most once
///   (enforced by [`PolicyTable::insert`]).
/// - Grant order is priority order and is preserved as inserted.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    /// Caller grants in insertion order.
    grants: BTreeMap<CallerId, Vec<PolicyEntry>>,
}

impl PolicyTable {
    /// Creates an empty policy table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            grants: BTreeMap::new(),
        }
    }

    /// Inserts a caller's ordered grants.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyTableError`] when the caller already has grants or a
    /// provider appears twice in the sequence; both would make grant
    /// priority ambiguous.
    pub fn insert(
        &mut self,
        caller: CallerId,
        entries: Vec<PolicyEntry>,
    ) -> Result<(), PolicyTableError> {
        let mut seen: BTreeSet<&ProviderName> = BTreeSet::new();
        for entry in &entries {
            if !seen.insert(&entry.provider) {
                return Err(PolicyTableError::DuplicateProvider {
                    caller,
                    provider: entry.provider.clone(),
                });
            }
        }
        if self.grants.contains_key(&caller) {
            return Err(PolicyTableError::DuplicateCaller(caller));
        }
        self.grants.insert(caller, entries);
        Ok(())
    }

    /// Returns the number of configured callers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Returns true when no caller is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Looks up a caller's grants in priority order.
    ///
    /// An unconfigured caller yields an empty slice, which every consumer
    /// must treat as a denial rather than an absence of restriction.
    #[must_use]
    pub fn policy_for(&self, caller: &CallerId) -> &[PolicyEntry] {
        self.grants.get(caller).map_or(&[], Vec::as_slice)
    }
}

/// Errors raised while building a policy table.
#[derive(Debug, Clone, Error)]
pub enum PolicyTableError {
    /// The same caller was inserted twice.
    #[error("duplicate policy for caller: {0}")]
    DuplicateCaller(CallerId),
    /// One caller's grants name the same provider twice.
    #[error("caller {caller} grants provider {provider} more than once")]
    DuplicateProvider {
        /// Caller whose grants are ambiguous.
        caller: CallerId,
        /// Provider granted more than once.
        provider: ProviderName,
    },
}

// ============================================================================
// SECTION: Policy Store
// ============================================================================

/// Immutable-after-init policy store shared by all requests.
#[derive(Debug, Default)]
pub struct PolicyStore {
    /// Frozen policy table.
    table: PolicyTable,
}

impl PolicyStore {
    /// Freezes a policy table into a shared store.
    #[must_use]
    pub fn new(table: PolicyTable) -> Self {
        Self {
            table,
        }
    }

    /// Looks up a caller's grants in priority order; empty means deny.
    #[must_use]
    pub fn policy_for(&self, caller: &CallerId) -> &[PolicyEntry] {
        self.table.policy_for(caller)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
