// crates/switchboard-core/src/aggregator.rs
// ============================================================================
// Module: Catalog Aggregator
// Description: Policy-scoped aggregation of upstream tool catalogs.
// Purpose: Present each caller a filtered, de-namespaced tool listing.
// Dependencies: switchboard-core::{client, policy, registry}
// ============================================================================

//! ## Overview
//! The aggregator walks a caller's grants in priority order, fetches each
//! granted provider's catalog, strips the provider prefix from qualified
//! names, and admits an entry only when the grant allows it and the bare
//! name has not been claimed by an earlier grant. Grant order therefore
//! doubles as collision-resolution order. A provider that cannot be reached
//! or resolved is reported as a fault and skipped; it never aborts the
//! other providers' contributions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::catalog::ToolDescriptor;
use crate::client::UpstreamClient;
use crate::identifiers::CallerIdentity;
use crate::identifiers::ProviderName;
use crate::identifiers::QualifiedToolName;
use crate::policy::PolicyStore;
use crate::registry::UpstreamRegistry;

// ============================================================================
// SECTION: Listing Results
// ============================================================================

/// One admitted tool in a caller's listing.
#[derive(Debug, Clone)]
pub struct AggregatedTool {
    /// Provider that owns the tool.
    pub provider: ProviderName,
    /// Descriptor carrying the bare name; all other fields are verbatim
    /// provider metadata.
    pub descriptor: ToolDescriptor,
}

impl AggregatedTool {
    /// Re-qualifies the bare name into the wire name the provider expects.
    #[must_use]
    pub fn qualified_name(&self) -> QualifiedToolName {
        QualifiedToolName::qualify(self.provider.clone(), self.descriptor.name.clone())
    }
}

/// Per-provider fault recorded during one listing.
#[derive(Debug, Clone)]
pub struct ProviderFault {
    /// Provider that failed.
    pub provider: ProviderName,
    /// Failure description for the audit log.
    pub message: String,
}

/// Result of one listing request.
#[derive(Debug, Clone, Default)]
pub struct ListingOutcome {
    /// Admitted tools in grant priority order.
    pub tools: Vec<AggregatedTool>,
    /// Providers skipped because of resolution or transport faults.
    pub faults: Vec<ProviderFault>,
}

// ============================================================================
// SECTION: Aggregator
// ============================================================================

/// Policy-scoped catalog aggregator shared by all requests.
pub struct CatalogAggregator {
    /// Caller policy store.
    policies: Arc<PolicyStore>,
    /// Upstream address registry.
    registry: Arc<UpstreamRegistry>,
    /// Upstream transport client.
    client: Arc<dyn UpstreamClient>,
}

impl CatalogAggregator {
    /// Builds an aggregator over the shared stores and transport client.
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

    /// Lists the tools visible to a caller.
    ///
    /// A caller without grants receives an empty listing without any
    /// upstream traffic. Per-provider faults are isolated: the failed
    /// provider's tools are omitted and the fault is reported in the
    /// outcome for the audit log.
    pub async fn list_tools_for(&self, identity: &CallerIdentity) -> ListingOutcome {
        let policy = self.policies.policy_for(&identity.id);
        let mut outcome = ListingOutcome::default();
        if policy.is_empty() {
            return outcome;
        }

        // Request-owned collision state: first grant to offer a bare name
        // keeps it for the entire listing.
        let mut seen: BTreeSet<String> = BTreeSet::new();

        for entry in policy {
            let target = match self.registry.resolve(&entry.provider) {
                Ok(target) => target,
                Err(err) => {
                    outcome.faults.push(ProviderFault {
                        provider: entry.provider.clone(),
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            let catalog = match self.client.list_tools(&target).await {
                Ok(catalog) => catalog,
                Err(err) => {
                    outcome.faults.push(ProviderFault {
                        provider: entry.provider.clone(),
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            for descriptor in catalog {
                let Some(qualified) = QualifiedToolName::split(&entry.provider, &descriptor.name)
                else {
                    // Entry without this provider's prefix; foreign to the
                    // grant, never exposed.
                    continue;
                };
                if !entry.tools.admits(qualified.bare()) {
                    continue;
                }
                if !seen.insert(qualified.bare().to_string()) {
                    continue;
                }
                outcome.tools.push(AggregatedTool {
                    provider: entry.provider.clone(),
                    descriptor: descriptor.with_name(qualified.bare()),
                });
            }
        }

        outcome
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
