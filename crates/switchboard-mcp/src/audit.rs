// crates/switchboard-mcp/src/audit.rs
// ============================================================================
// Module: Proxy Audit Events
// Description: Structured audit events for proxy security decisions.
// Purpose: Record authn outcomes, routing results, and admin changes.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every security-relevant decision the proxy makes is recorded as a JSON
//! line through an audit sink: authentication allow/deny, listing results
//! with per-provider faults, invocation routing outcomes, and administrative
//! upstream registrations. Sinks must never block the request path on I/O
//! beyond a line write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use switchboard_core::CallerIdentity;
use switchboard_core::InvocationOutcome;
use switchboard_core::ListingOutcome;
use switchboard_core::ProviderName;
use switchboard_core::ProxyError;

use crate::auth::AuthError;
use crate::auth::RequestContext;

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Proxy audit event payload.
#[derive(Debug, Serialize)]
pub struct ProxyAuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Decision outcome.
    decision: &'static str,
    /// Verified caller subject, when authentication succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    caller: Option<String>,
    /// Scopes granted by the credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    scopes: Option<Vec<String>>,
    /// Bare tool name for invocation events.
    #[serde(skip_serializing_if = "Option::is_none")]
    tool: Option<String>,
    /// Provider that served the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<String>,
    /// Providers skipped before the serving provider answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    skipped: Option<Vec<String>>,
    /// Per-provider faults isolated during a listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    faults: Option<Vec<String>>,
    /// Number of tools admitted into a listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    tools_listed: Option<usize>,
    /// Bearer token fingerprint (sha256), never the token itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    token_fingerprint: Option<String>,
    /// Failure reason for deny and error events.
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    /// Request identifier, if the caller supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

impl ProxyAuditEvent {
    /// Builds an authentication denial event.
    #[must_use]
    pub fn authn_denied(
        ctx: &RequestContext,
        error: &AuthError,
        token_fingerprint: Option<String>,
    ) -> Self {
        Self {
            event: "authn",
            decision: "deny",
            caller: None,
            scopes: None,
            tool: None,
            provider: None,
            skipped: None,
            faults: None,
            tools_listed: None,
            token_fingerprint,
            reason: Some(error.to_string()),
            request_id: ctx.request_id.clone(),
        }
    }

    /// Builds a listing event with isolated provider faults.
    #[must_use]
    pub fn listing(ctx: &RequestContext, identity: &CallerIdentity, outcome: &ListingOutcome) -> Self {
        let faults: Vec<String> = outcome
            .faults
            .iter()
            .map(|fault| format!("{}: {}", fault.provider, fault.message))
            .collect();
        Self {
            event: "list_tools",
            decision: "allow",
            caller: Some(identity.id.to_string()),
            scopes: Some(identity.scopes.clone()),
            tool: None,
            provider: None,
            skipped: None,
            faults: (!faults.is_empty()).then_some(faults),
            tools_listed: Some(outcome.tools.len()),
            token_fingerprint: None,
            reason: None,
            request_id: ctx.request_id.clone(),
        }
    }

    /// Builds a successful invocation event.
    #[must_use]
    pub fn invocation_served(
        ctx: &RequestContext,
        identity: &CallerIdentity,
        tool: &str,
        outcome: &InvocationOutcome,
    ) -> Self {
        Self {
            event: "call_tool",
            decision: "allow",
            caller: Some(identity.id.to_string()),
            scopes: None,
            tool: Some(tool.to_string()),
            provider: Some(outcome.provider.to_string()),
            skipped: (!outcome.skipped.is_empty())
                .then(|| outcome.skipped.iter().map(ToString::to_string).collect()),
            faults: None,
            tools_listed: None,
            token_fingerprint: None,
            reason: None,
            request_id: ctx.request_id.clone(),
        }
    }

    /// Builds a failed invocation event.
    #[must_use]
    pub fn invocation_failed(
        ctx: &RequestContext,
        identity: &CallerIdentity,
        tool: &str,
        error: &ProxyError,
    ) -> Self {
        let decision = match error {
            ProxyError::AccessDenied(_) => "deny",
            _ => "error",
        };
        Self {
            event: "call_tool",
            decision,
            caller: Some(identity.id.to_string()),
            scopes: None,
            tool: Some(tool.to_string()),
            provider: None,
            skipped: None,
            faults: None,
            tools_listed: None,
            token_fingerprint: None,
            reason: Some(error.to_string()),
            request_id: ctx.request_id.clone(),
        }
    }

    /// Builds an administrative registration event.
    #[must_use]
    pub fn admin_registered(provider: &ProviderName, url: &str, token_fingerprint: String) -> Self {
        Self {
            event: "admin_register",
            decision: "allow",
            caller: None,
            scopes: None,
            tool: None,
            provider: Some(provider.to_string()),
            skipped: None,
            faults: None,
            tools_listed: None,
            token_fingerprint: Some(token_fingerprint),
            reason: Some(format!("registered at {url}")),
            request_id: None,
        }
    }
}

// ============================================================================
// SECTION: Audit Sinks
// ============================================================================

/// Audit sink for proxy decisions.
pub trait ProxyAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &ProxyAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ProxyAuditSink for StderrAuditSink {
    #[allow(clippy::print_stderr, reason = "Stderr is this sink's output channel.")]
    fn record(&self, event: &ProxyAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            eprintln!("{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopAuditSink;

impl ProxyAuditSink for NoopAuditSink {
    fn record(&self, _event: &ProxyAuditEvent) {}
}
