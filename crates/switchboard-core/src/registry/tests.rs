// crates/switchboard-core/src/registry/tests.rs
// ============================================================================
// Module: Registry Tests
// Description: Unit tests for the upstream registry.
// Purpose: Validate resolution, overwrite, and unknown-provider behavior.
// Dependencies: switchboard-core
// ============================================================================

//! Upstream registry unit tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

use super::UpstreamRegistry;
use crate::client::UpstreamTarget;
use crate::error::ProxyError;
use crate::identifiers::ProviderName;

fn provider(name: &str) -> ProviderName {
    ProviderName::parse(name).unwrap()
}

#[test]
fn resolve_returns_registered_target() {
    let registry = UpstreamRegistry::new();
    registry.register(provider("svca"), UpstreamTarget::new("http://127.0.0.1:9004/rpc"));

    let target = registry.resolve(&provider("svca")).unwrap();
    assert_eq!(target.url, "http://127.0.0.1:9004/rpc");
}

#[test]
fn resolve_unknown_provider_fails() {
    let registry = UpstreamRegistry::new();
    let result = registry.resolve(&provider("ghost"));
    assert!(matches!(result, Err(ProxyError::UnknownProvider(name)) if name.as_str() == "ghost"));
}

#[test]
fn reregistration_overwrites_silently() {
    let registry = UpstreamRegistry::new();
    registry.register(provider("svca"), UpstreamTarget::new("http://127.0.0.1:9004/rpc"));
    registry.register(provider("svca"), UpstreamTarget::new("http://127.0.0.1:9104/rpc"));

    let target = registry.resolve(&provider("svca")).unwrap();
    assert_eq!(target.url, "http://127.0.0.1:9104/rpc");
    assert_eq!(registry.provider_names().len(), 1);
}

#[test]
fn provider_names_are_sorted() {
    let registry = UpstreamRegistry::new();
    registry.register(provider("svcb"), UpstreamTarget::new("http://127.0.0.1:9005/rpc"));
    registry.register(provider("svca"), UpstreamTarget::new("http://127.0.0.1:9004/rpc"));

    let names: Vec<String> =
        registry.provider_names().iter().map(|name| name.as_str().to_string()).collect();
    assert_eq!(names, vec!["svca", "svcb"]);
}
