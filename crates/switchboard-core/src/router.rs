// crates/switchboard-core/src/router.rs
// ============================================================================
// Module: Invocation Router
// Description: Policy-driven dispatch of tool calls across providers.
// Purpose: Route a bare-named call to the first granted provider that has it.
// Dependencies: switchboard-core::{client, policy, registry}
// ============================================================================

//! ## Overview
//! The router builds the caller's candidate list (every grant whose
//! specifier admits the bare name, in grant order) and tries each candidate
//! with a freshly qualified name. Fallback is asymmetric on purpose: only a
//! "tool not implemented" answer moves the router to the next candidate. Any
//! other failure is terminal, because the tool may already have executed and
//! a blind retry against another provider could duplicate side effects.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::client::UpstreamClient;
use crate::error::ProxyError;
use crate::error::UpstreamError;
use crate::identifiers::CallerIdentity;
use crate::identifiers::ProviderName;
use crate::identifiers::QualifiedToolName;
use crate::policy::PolicyStore;
use crate::registry::UpstreamRegistry;

// ============================================================================
// SECTION: Invocation Results
// ============================================================================

/// Result of one successfully routed invocation.
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    /// Provider that served the call.
    pub provider: ProviderName,
    /// Candidates tried earlier that reported the tool missing.
    pub skipped: Vec<ProviderName>,
    /// Provider result payload, passed through verbatim.
    pub result: Value,
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Policy-driven invocation router shared by all requests.
pub struct InvocationRouter {
    /// Caller policy store.
    policies: Arc<PolicyStore>,
    /// Upstream address registry.
    registry: Arc<UpstreamRegistry>,
    /// Upstream transport client.
    client: Arc<dyn UpstreamClient>,
}

impl InvocationRouter {
    /// Builds a router over the shared stores and transport client.
    #[must_use]
    pub fn new(
        policies: Arc<PolicyStore>,
        registry: Arc<UpstreamRegistry>,
        client: Arc<dyn UpstreamClient>,
    ) -> Self {
        Self {
            policies,
            registry,
            client,
        }
    }

    /// Invokes a bare-named tool on behalf of a caller.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::AccessDenied`] when the caller has no grants or
    /// no grant admits the name, [`ProxyError::ToolNotFound`] when every
    /// candidate reports the tool missing, and the candidate's own failure
    /// when a reached provider fails for any other reason.
    pub async fn invoke(
        &self,
        identity: &CallerIdentity,
        bare_name: &str,
        arguments: Value,
    ) -> Result<InvocationOutcome, ProxyError> {
        let policy = self.policies.policy_for(&identity.id);
        if policy.is_empty() {
            return Err(ProxyError::AccessDenied(format!(
                "no policy configured for caller {}",
                identity.id
            )));
        }

        let candidates: Vec<&ProviderName> = policy
            .iter()
            .filter(|entry| entry.tools.admits(bare_name))
            .map(|entry| &entry.provider)
            .collect();
        if candidates.is_empty() {
            return Err(ProxyError::AccessDenied(format!(
                "caller {} is not granted tool {bare_name}",
                identity.id
            )));
        }

        let mut skipped = Vec::new();
        for provider in candidates {
            let target = match self.registry.resolve(provider) {
                Ok(target) => target,
                Err(_) => {
                    // Configuration fault: the grant names a provider the
                    // registry does not know. Nothing ran on that provider,
                    // so it is treated as absent for this call.
                    skipped.push(provider.clone());
                    continue;
                }
            };
            // Each attempt builds a fresh qualified request; nothing shared
            // between attempts can be left renamed.
            let qualified = QualifiedToolName::qualify(provider.clone(), bare_name);
            match self.client.call_tool(&target, &qualified, arguments.clone()).await {
                Ok(result) => {
                    return Ok(InvocationOutcome {
                        provider: provider.clone(),
                        skipped,
                        result,
                    });
                }
                Err(UpstreamError::ToolMissing) => {
                    skipped.push(provider.clone());
                }
                Err(UpstreamError::Unreachable(message)) => {
                    return Err(ProxyError::UpstreamUnreachable {
                        provider: provider.clone(),
                        message,
                    });
                }
                Err(UpstreamError::Call {
                    code,
                    message,
                }) => {
                    return Err(ProxyError::Provider {
                        provider: provider.clone(),
                        code,
                        message,
                    });
                }
                Err(UpstreamError::Protocol(message)) => {
                    return Err(ProxyError::Internal(format!(
                        "protocol error from {provider}: {message}"
                    )));
                }
            }
        }

        Err(ProxyError::ToolNotFound(bare_name.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
