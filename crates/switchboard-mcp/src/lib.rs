// crates/switchboard-mcp/src/lib.rs
// ============================================================================
// Module: Switchboard MCP Library
// Description: Transport shell for the Switchboard aggregation proxy.
// Purpose: Provide the JSON-RPC server, upstream client, and auth layer.
// Dependencies: switchboard-core, switchboard-config, axum, reqwest, tokio
// ============================================================================

//! ## Overview
//! Switchboard MCP wires the proxy engine to the network: an axum JSON-RPC
//! server on the caller side, a reqwest JSON-RPC client on the provider
//! side, RS256 bearer credential verification in between, and JSON-line
//! audit sinks for every security decision.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod server;
pub mod upstream;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::NoopAuditSink;
pub use audit::ProxyAuditEvent;
pub use audit::ProxyAuditSink;
pub use audit::StderrAuditSink;
pub use auth::AuthError;
pub use auth::CallerAuthn;
pub use auth::RequestContext;
pub use auth::TokenVerifier;
pub use auth::VerifierError;
pub use server::BoundProxyServer;
pub use server::ProxyServer;
pub use server::ProxyServerError;
pub use upstream::HttpUpstreamClient;
