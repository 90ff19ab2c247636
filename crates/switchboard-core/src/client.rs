// crates/switchboard-core/src/client.rs
// ============================================================================
// Module: Upstream Client Interface
// Description: Seam between the proxy engine and the upstream transport.
// Purpose: Let the engine list and call provider tools without wire details.
// Dependencies: async-trait, serde, serde_json
// ============================================================================

//! ## Overview
//! The proxy engine reaches upstream providers only through
//! [`UpstreamClient`]. The production implementation speaks JSON-RPC over
//! HTTP; engine tests substitute an in-memory fake. Both operations take the
//! resolved [`UpstreamTarget`] so the engine, not the client, decides which
//! provider serves a request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::catalog::ToolDescriptor;
use crate::error::UpstreamError;
use crate::identifiers::QualifiedToolName;

// ============================================================================
// SECTION: Upstream Targets
// ============================================================================

/// Resolved network location of one upstream provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamTarget {
    /// Base URL of the provider's JSON-RPC endpoint.
    pub url: String,
    /// Optional static bearer token presented to the provider.
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Optional per-provider request timeout override in milliseconds.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl UpstreamTarget {
    /// Builds a target with no credentials and default timeouts.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bearer_token: None,
            request_timeout_ms: None,
        }
    }
}

// ============================================================================
// SECTION: Client Interface
// ============================================================================

/// Transport client for upstream tool providers.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Fetches the provider's full tool catalog.
    ///
    /// Catalog entries carry provider-qualified names; the engine strips the
    /// prefix on admission.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the provider cannot be reached or
    /// answers with a malformed catalog.
    async fn list_tools(&self, target: &UpstreamTarget) -> Result<Vec<ToolDescriptor>, UpstreamError>;

    /// Invokes a tool by its provider-qualified name.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::ToolMissing`] when the provider does not
    /// implement the tool, and other [`UpstreamError`] variants for
    /// transport, protocol, or execution failures.
    async fn call_tool(
        &self,
        target: &UpstreamTarget,
        tool: &QualifiedToolName,
        arguments: Value,
    ) -> Result<Value, UpstreamError>;
}
