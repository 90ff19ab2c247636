// crates/switchboard-core/src/catalog.rs
// ============================================================================
// Module: Tool Catalog Types
// Description: Tool descriptors exchanged with callers and providers.
// Purpose: Carry provider metadata verbatim while the proxy rewrites names.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ToolDescriptor`] is one entry of a provider's tool catalog. The proxy
//! inspects and rewrites only the `name` field; the description, the input
//! schema, and any additional fields a provider attaches are passed through
//! verbatim to callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Descriptor Types
// ============================================================================

/// One tool catalog entry.
///
/// # Invariants
/// - `name` is the only field the proxy interprets; everything else is
///   provider-opaque and preserved byte-for-byte across the proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name. Provider-qualified on the upstream wire, bare toward callers.
    pub name: String,
    /// Tool description for clients.
    #[serde(default)]
    pub description: String,
    /// JSON schema for tool input.
    #[serde(default)]
    pub input_schema: Value,
    /// Additional provider metadata, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolDescriptor {
    /// Returns a copy of this descriptor carrying a different name.
    #[must_use]
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
            extra: self.extra.clone(),
        }
    }
}
