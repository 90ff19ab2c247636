// crates/switchboard-core/src/error.rs
// ============================================================================
// Module: Proxy Error Taxonomy
// Description: Closed error sets for proxy operations and upstream calls.
// Purpose: Keep policy, routing, and upstream failures distinguishable.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Switchboard surfaces a closed set of error kinds so callers can tell an
//! authentication failure from a policy denial and a missing tool from a
//! failed one. [`UpstreamError`] is the client-seam taxonomy; its
//! `ToolMissing` variant is the only recoverable signal during routing,
//! because retrying an invocation that actually ran could duplicate side
//! effects.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::identifiers::ProviderName;

// ============================================================================
// SECTION: Proxy Errors
// ============================================================================

/// Errors surfaced by proxy listing and invocation operations.
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    /// Credential missing, invalid, or expired.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Caller has no policy, or the policy grants no matching provider.
    #[error("access denied: {0}")]
    AccessDenied(String),
    /// Registry has no address for a configured provider name.
    #[error("unknown provider: {0}")]
    UnknownProvider(ProviderName),
    /// Transport failure reaching a provider during an invocation.
    #[error("upstream unreachable: {provider}: {message}")]
    UpstreamUnreachable {
        /// Provider that could not be reached.
        provider: ProviderName,
        /// Transport failure detail.
        message: String,
    },
    /// No eligible provider implements the requested tool.
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    /// Provider-side execution error, propagated verbatim.
    #[error("provider error from {provider}: {message}")]
    Provider {
        /// Provider that reported the error.
        provider: ProviderName,
        /// Provider error code, passed through unchanged.
        code: i64,
        /// Provider error message, passed through unchanged.
        message: String,
    },
    /// Payload serialization failed.
    #[error("serialization failure")]
    Serialization,
    /// Internal proxy fault.
    #[error("internal error: {0}")]
    Internal(String),
}

// ============================================================================
// SECTION: Upstream Errors
// ============================================================================

/// Errors returned by an upstream client call.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// The provider does not implement the requested tool.
    ///
    /// This is the fallback signal: the router moves on to the next
    /// eligible provider instead of failing the request.
    #[error("tool not implemented by provider")]
    ToolMissing,
    /// The provider could not be reached or the transport failed mid-call.
    #[error("unreachable: {0}")]
    Unreachable(String),
    /// The provider executed the call and reported an error.
    #[error("call failed: {code}: {message}")]
    Call {
        /// Provider error code.
        code: i64,
        /// Provider error message.
        message: String,
    },
    /// The provider answered with a malformed or oversized response.
    #[error("protocol error: {0}")]
    Protocol(String),
}
