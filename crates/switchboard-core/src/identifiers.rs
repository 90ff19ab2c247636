// crates/switchboard-core/src/identifiers.rs
// ============================================================================
// Module: Switchboard Identifiers
// Description: Canonical identifiers for callers, providers, and tool names.
// Purpose: Provide strongly typed identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the identifiers used throughout Switchboard. Caller
//! identifiers are opaque strings taken from a verified credential. Provider
//! names are validated at construction so that the provider-qualified wire
//! form of a tool name stays reversible: the separator character never
//! occurs inside a provider name, which makes prefix stripping unambiguous.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Separator between a provider name and a bare tool name on the wire.
pub const TOOL_NAME_SEPARATOR: char = '_';

/// Maximum accepted length of a provider name.
const MAX_PROVIDER_NAME_LENGTH: usize = 64;

// ============================================================================
// SECTION: Caller Identifiers
// ============================================================================

/// Caller identifier taken from a verified credential subject.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    /// Creates a new caller identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CallerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CallerId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Verified caller identity for a single request.
///
/// # Invariants
/// - Produced once per request by the credential verifier; never persisted.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    /// Verified credential subject.
    pub id: CallerId,
    /// Scope strings granted by the credential.
    pub scopes: Vec<String>,
}

impl CallerIdentity {
    /// Builds an identity from a verified subject and its granted scopes.
    #[must_use]
    pub fn new(id: CallerId, scopes: Vec<String>) -> Self {
        Self {
            id,
            scopes,
        }
    }
}

// ============================================================================
// SECTION: Provider Names
// ============================================================================

/// Name of one upstream tool provider.
///
/// # Invariants
/// - Non-empty, at most 64 bytes, lowercase ASCII alphanumeric or `-`.
/// - Never contains [`TOOL_NAME_SEPARATOR`], so qualified tool names decode
///   unambiguously by prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProviderName(String);

impl ProviderName {
    /// Parses a provider name, returning `None` when the name is invalid.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        if name.is_empty() || name.len() > MAX_PROVIDER_NAME_LENGTH {
            return None;
        }
        let valid = name.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-');
        if !valid {
            return None;
        }
        Some(Self(name.to_string()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for ProviderName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid provider name: {raw}"))
        })
    }
}

// ============================================================================
// SECTION: Qualified Tool Names
// ============================================================================

/// Provider-qualified tool name as used on the upstream wire.
///
/// # Invariants
/// - The wire form is `{provider}{TOOL_NAME_SEPARATOR}{bare}`.
/// - Reversible because provider names never contain the separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedToolName {
    /// Owning provider.
    provider: ProviderName,
    /// Bare tool name as seen by callers.
    bare: String,
}

impl QualifiedToolName {
    /// Qualifies a bare tool name with its owning provider.
    #[must_use]
    pub fn qualify(provider: ProviderName, bare: impl Into<String>) -> Self {
        Self {
            provider,
            bare: bare.into(),
        }
    }

    /// Decodes a wire name fetched from the given provider.
    ///
    /// Returns `None` when the wire name does not carry the provider's
    /// prefix, which marks the entry as foreign to that provider.
    #[must_use]
    pub fn split(provider: &ProviderName, wire_name: &str) -> Option<Self> {
        let prefix = format!("{}{}", provider.as_str(), TOOL_NAME_SEPARATOR);
        let bare = wire_name.strip_prefix(&prefix)?;
        if bare.is_empty() {
            return None;
        }
        Some(Self {
            provider: provider.clone(),
            bare: bare.to_string(),
        })
    }

    /// Returns the owning provider.
    #[must_use]
    pub fn provider(&self) -> &ProviderName {
        &self.provider
    }

    /// Returns the bare tool name.
    #[must_use]
    pub fn bare(&self) -> &str {
        &self.bare
    }

    /// Encodes the wire form sent to the owning provider.
    #[must_use]
    pub fn wire_name(&self) -> String {
        format!("{}{}{}", self.provider.as_str(), TOOL_NAME_SEPARATOR, self.bare)
    }
}

impl fmt::Display for QualifiedToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.provider.as_str(), TOOL_NAME_SEPARATOR, self.bare)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
