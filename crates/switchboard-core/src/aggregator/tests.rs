// crates/switchboard-core/src/aggregator/tests.rs
// ============================================================================
// Module: Aggregator Tests
// Description: Unit tests for policy-scoped catalog aggregation.
// Purpose: Validate filtering, renaming, collision order, and fault isolation.
// Dependencies: switchboard-core, tokio
// ============================================================================

//! Catalog aggregator unit tests against an in-memory upstream fake.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;

use super::CatalogAggregator;
use crate::catalog::ToolDescriptor;
use crate::client::UpstreamClient;
use crate::client::UpstreamTarget;
use crate::error::UpstreamError;
use crate::identifiers::CallerId;
use crate::identifiers::CallerIdentity;
use crate::identifiers::ProviderName;
use crate::identifiers::QualifiedToolName;
use crate::policy::PolicyEntry;
use crate::policy::PolicyStore;
use crate::policy::PolicyTable;
use crate::policy::ToolSpecifier;
use crate::registry::UpstreamRegistry;

/// In-memory upstream fake keyed by target URL.
#[derive(Default)]
struct FakeUpstream {
    /// Catalog served per URL; absent URL answers unreachable.
    catalogs: Mutex<BTreeMap<String, Vec<ToolDescriptor>>>,
    /// Number of catalog fetches issued.
    list_calls: AtomicUsize,
}

impl FakeUpstream {
    fn serve(&self, url: &str, names: &[&str]) {
        let catalog = names.iter().map(|name| descriptor(name)).collect();
        self.catalogs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(url.to_string(), catalog);
    }
}

#[async_trait]
impl UpstreamClient for FakeUpstream {
    async fn list_tools(
        &self,
        target: &UpstreamTarget,
    ) -> Result<Vec<ToolDescriptor>, UpstreamError> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        self.catalogs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&target.url)
            .cloned()
            .ok_or_else(|| UpstreamError::Unreachable("connection refused".to_string()))
    }

    async fn call_tool(
        &self,
        _target: &UpstreamTarget,
        _tool: &QualifiedToolName,
        _arguments: Value,
    ) -> Result<Value, UpstreamError> {
        Err(UpstreamError::Protocol("call_tool not faked".to_string()))
    }
}

fn provider(name: &str) -> ProviderName {
    ProviderName::parse(name).unwrap()
}

fn descriptor(name: &str) -> ToolDescriptor {
    ToolDescriptor {
        name: name.to_string(),
        description: format!("{name} description"),
        input_schema: json!({"type": "object"}),
        extra: serde_json::Map::new(),
    }
}

fn named(tools: &[&str]) -> ToolSpecifier {
    ToolSpecifier::Named(tools.iter().map(ToString::to_string).collect::<BTreeSet<_>>())
}

fn identity(id: &str) -> CallerIdentity {
    CallerIdentity::new(CallerId::from(id), vec!["list_tools".to_string()])
}

struct Fixture {
    aggregator: CatalogAggregator,
    fake: Arc<FakeUpstream>,
    registry: Arc<UpstreamRegistry>,
}

fn fixture(grants: Vec<(&str, Vec<PolicyEntry>)>) -> Fixture {
    let mut table = PolicyTable::new();
    for (caller, entries) in grants {
        table.insert(CallerId::from(caller), entries).unwrap();
    }
    let registry = Arc::new(UpstreamRegistry::new());
    let fake = Arc::new(FakeUpstream::default());
    let aggregator = CatalogAggregator::new(
        Arc::new(PolicyStore::new(table)),
        Arc::clone(&registry),
        Arc::clone(&fake) as Arc<dyn UpstreamClient>,
    );
    Fixture {
        aggregator,
        fake,
        registry,
    }
}

#[tokio::test]
async fn unconfigured_caller_gets_empty_listing_without_upstream_traffic() {
    let fixture = fixture(Vec::new());
    let outcome = fixture.aggregator.list_tools_for(&identity("ghost")).await;
    assert!(outcome.tools.is_empty());
    assert!(outcome.faults.is_empty());
    assert_eq!(fixture.fake.list_calls.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn listing_filters_and_strips_prefixes() {
    // Scenario: svcA grants only "greet", svcB grants everything; svcA wins
    // the "greet" collision by grant order.
    let fixture = fixture(vec![(
        "agent-a",
        vec![
            PolicyEntry {
                provider: provider("svca"),
                tools: named(&["greet"]),
            },
            PolicyEntry {
                provider: provider("svcb"),
                tools: ToolSpecifier::All,
            },
        ],
    )]);
    fixture.registry.register(provider("svca"), UpstreamTarget::new("http://a/rpc"));
    fixture.registry.register(provider("svcb"), UpstreamTarget::new("http://b/rpc"));
    fixture.fake.serve("http://a/rpc", &["svca_greet", "svca_farewell"]);
    fixture.fake.serve("http://b/rpc", &["svcb_greet", "svcb_ping"]);

    let outcome = fixture.aggregator.list_tools_for(&identity("agent-a")).await;
    let listed: Vec<(&str, &str)> = outcome
        .tools
        .iter()
        .map(|tool| (tool.provider.as_str(), tool.descriptor.name.as_str()))
        .collect();
    assert_eq!(listed, vec![("svca", "greet"), ("svcb", "ping")]);
    assert!(outcome.faults.is_empty());
}

#[tokio::test]
async fn collision_resolution_is_order_stable() {
    let fixture = fixture(vec![(
        "agent-a",
        vec![
            PolicyEntry {
                provider: provider("p1"),
                tools: ToolSpecifier::All,
            },
            PolicyEntry {
                provider: provider("p2"),
                tools: ToolSpecifier::All,
            },
        ],
    )]);
    fixture.registry.register(provider("p1"), UpstreamTarget::new("http://p1/rpc"));
    fixture.registry.register(provider("p2"), UpstreamTarget::new("http://p2/rpc"));
    fixture.fake.serve("http://p1/rpc", &["p1_x"]);
    fixture.fake.serve("http://p2/rpc", &["p2_x"]);

    let outcome = fixture.aggregator.list_tools_for(&identity("agent-a")).await;
    assert_eq!(outcome.tools.len(), 1);
    assert_eq!(outcome.tools[0].provider.as_str(), "p1");
    assert_eq!(outcome.tools[0].descriptor.name, "x");
    assert_eq!(outcome.tools[0].descriptor.description, "p1_x description");
}

#[tokio::test]
async fn unreachable_provider_is_isolated_and_reported() {
    let fixture = fixture(vec![(
        "agent-a",
        vec![
            PolicyEntry {
                provider: provider("down"),
                tools: ToolSpecifier::All,
            },
            PolicyEntry {
                provider: provider("up"),
                tools: ToolSpecifier::All,
            },
        ],
    )]);
    fixture.registry.register(provider("down"), UpstreamTarget::new("http://down/rpc"));
    fixture.registry.register(provider("up"), UpstreamTarget::new("http://up/rpc"));
    fixture.fake.serve("http://up/rpc", &["up_ping"]);

    let outcome = fixture.aggregator.list_tools_for(&identity("agent-a")).await;
    assert_eq!(outcome.tools.len(), 1);
    assert_eq!(outcome.tools[0].descriptor.name, "ping");
    assert_eq!(outcome.faults.len(), 1);
    assert_eq!(outcome.faults[0].provider.as_str(), "down");
    assert!(outcome.faults[0].message.contains("unreachable"));
}

#[tokio::test]
async fn unregistered_provider_is_isolated_and_reported() {
    let fixture = fixture(vec![(
        "agent-a",
        vec![
            PolicyEntry {
                provider: provider("missing"),
                tools: ToolSpecifier::All,
            },
            PolicyEntry {
                provider: provider("up"),
                tools: ToolSpecifier::All,
            },
        ],
    )]);
    fixture.registry.register(provider("up"), UpstreamTarget::new("http://up/rpc"));
    fixture.fake.serve("http://up/rpc", &["up_ping"]);

    let outcome = fixture.aggregator.list_tools_for(&identity("agent-a")).await;
    assert_eq!(outcome.tools.len(), 1);
    assert_eq!(outcome.faults.len(), 1);
    assert!(outcome.faults[0].message.contains("unknown provider"));
}

#[tokio::test]
async fn entries_without_the_grant_prefix_are_skipped() {
    let fixture = fixture(vec![(
        "agent-a",
        vec![PolicyEntry {
            provider: provider("svca"),
            tools: ToolSpecifier::All,
        }],
    )]);
    fixture.registry.register(provider("svca"), UpstreamTarget::new("http://a/rpc"));
    fixture.fake.serve("http://a/rpc", &["svca_greet", "svcb_greet", "bare"]);

    let outcome = fixture.aggregator.list_tools_for(&identity("agent-a")).await;
    let listed: Vec<&str> =
        outcome.tools.iter().map(|tool| tool.descriptor.name.as_str()).collect();
    assert_eq!(listed, vec!["greet"]);
}

#[tokio::test]
async fn admitted_tools_requalify_to_the_original_wire_name() {
    let fixture = fixture(vec![(
        "agent-a",
        vec![PolicyEntry {
            provider: provider("mcp1"),
            tools: ToolSpecifier::All,
        }],
    )]);
    fixture.registry.register(provider("mcp1"), UpstreamTarget::new("http://mcp1/rpc"));
    fixture.fake.serve("http://mcp1/rpc", &["mcp1_update_battle_process"]);

    let outcome = fixture.aggregator.list_tools_for(&identity("agent-a")).await;
    assert_eq!(outcome.tools.len(), 1);
    assert_eq!(outcome.tools[0].qualified_name().wire_name(), "mcp1_update_battle_process");
}
