// crates/switchboard-mcp/tests/common/mod.rs
// ============================================================================
// Module: MCP Test Support
// Description: Shared fixtures for proxy integration tests.
// Purpose: Mint test tokens and run stub upstream providers.
// Dependencies: axum, jsonwebtoken, switchboard-config, tokio
// ============================================================================

//! Shared helpers for the proxy integration tests: an RS256 test key pair,
//! token minting, configuration builders, and a stub JSON-RPC upstream.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only support code; not every test uses every helper."
)]

use std::collections::BTreeMap;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use axum::Router;
use axum::extract::State;
use axum::routing::post;
use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use switchboard_config::AuthConfig;
use switchboard_config::CallerPolicyConfig;
use switchboard_config::ServerConfig;
use switchboard_config::SwitchboardConfig;
use switchboard_config::UpstreamConfig;

/// Test-only RSA private key; never use outside tests.
pub const TEST_PRIVATE_PEM: &str = include_str!("../fixtures/test_private.pem");
/// Public half of the test key pair.
pub const TEST_PUBLIC_PEM: &str = include_str!("../fixtures/test_public.pem");

/// Issuer used across the integration tests.
pub const ISSUER: &str = "https://switchboard";
/// Audience used across the integration tests.
pub const AUDIENCE: &str = "switchboard-callers";

/// Claims minted for test tokens.
#[derive(Serialize)]
struct TestClaims {
    /// Subject (caller identifier).
    sub: String,
    /// Issuer claim.
    iss: String,
    /// Audience claim.
    aud: String,
    /// Expiry timestamp.
    exp: i64,
    /// Issued-at timestamp.
    iat: i64,
    /// Space-delimited scope string.
    scope: String,
}

/// Mints an RS256 token for the given subject.
pub fn mint_token(sub: &str, exp_offset: i64) -> String {
    mint_token_with(sub, ISSUER, AUDIENCE, exp_offset)
}

/// Mints an RS256 token with explicit issuer and audience claims.
pub fn mint_token_with(sub: &str, iss: &str, aud: &str, exp_offset: i64) -> String {
    let now = i64::try_from(
        SystemTime::now().duration_since(UNIX_EPOCH).expect("clock").as_secs(),
    )
    .expect("timestamp");
    let claims = TestClaims {
        sub: sub.to_string(),
        iss: iss.to_string(),
        aud: aud.to_string(),
        exp: now + exp_offset,
        iat: now,
        scope: "list_tools call_tools".to_string(),
    };
    let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_PEM.as_bytes()).expect("test key");
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key).expect("sign token")
}

/// Writes the test public key to a temp file for the proxy configuration.
pub fn write_public_key() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp key file");
    file.write_all(TEST_PUBLIC_PEM.as_bytes()).expect("write key");
    file
}

/// Builds a proxy configuration bound to an ephemeral port.
pub fn proxy_config(
    key_path: &std::path::Path,
    upstreams: Vec<UpstreamConfig>,
    callers: Vec<CallerPolicyConfig>,
) -> SwitchboardConfig {
    SwitchboardConfig {
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
            max_body_bytes: 1024 * 1024,
        },
        auth: AuthConfig {
            public_key_path: key_path.to_path_buf(),
            issuer: ISSUER.to_string(),
            audience: AUDIENCE.to_string(),
        },
        admin: switchboard_config::AdminConfig::default(),
        upstream_http: switchboard_config::UpstreamHttpConfig::default(),
        upstreams,
        callers,
    }
}

/// Builds an insecure-HTTP upstream entry for a stub address.
pub fn stub_upstream(name: &str, addr: SocketAddr) -> UpstreamConfig {
    UpstreamConfig {
        name: switchboard_core::ProviderName::parse(name).expect("provider name"),
        url: format!("http://{addr}/rpc"),
        bearer_token: None,
        allow_insecure_http: true,
        request_timeout_ms: None,
    }
}

// ============================================================================
// SECTION: Stub Upstream Provider
// ============================================================================

/// Scripted behavior for one stub tool.
#[derive(Clone)]
pub enum StubBehavior {
    /// Answer the payload.
    Ok(Value),
    /// Fail with a provider-side execution error.
    Fail(i64, String),
}

/// Shared stub state: served tools and observed calls.
pub struct StubState {
    /// Tools served by the stub, keyed by wire name.
    tools: BTreeMap<String, StubBehavior>,
    /// Wire names of tools called, in order.
    pub calls: Mutex<Vec<String>>,
}

impl StubState {
    /// Returns the wire names called so far.
    pub fn called(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }
}

/// Spawns a stub upstream provider on an ephemeral port.
///
/// The stub speaks the same JSON-RPC surface as the proxy: `tools/list`
/// returns every configured tool under its wire name, `tools/call` answers
/// the scripted behavior or `-32601` for unknown names.
pub async fn spawn_stub(tools: Vec<(&str, StubBehavior)>) -> (SocketAddr, Arc<StubState>) {
    let state = Arc::new(StubState {
        tools: tools.into_iter().map(|(name, behavior)| (name.to_string(), behavior)).collect(),
        calls: Mutex::new(Vec::new()),
    });
    let app = Router::new().route("/rpc", post(handle_stub)).with_state(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("stub bind");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, state)
}

/// Handles one stub JSON-RPC request.
async fn handle_stub(
    State(state): State<Arc<StubState>>,
    axum::Json(request): axum::Json<Value>,
) -> axum::Json<Value> {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request.get("method").and_then(Value::as_str).unwrap_or_default();
    match method {
        "tools/list" => {
            let tools: Vec<Value> = state
                .tools
                .keys()
                .map(|name| {
                    json!({
                        "name": name,
                        "description": format!("{name} description"),
                        "input_schema": {"type": "object"},
                    })
                })
                .collect();
            axum::Json(json!({"jsonrpc": "2.0", "id": id, "result": {"tools": tools}}))
        }
        "tools/call" => {
            let name = request
                .pointer("/params/name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            state
                .calls
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(name.clone());
            match state.tools.get(&name) {
                Some(StubBehavior::Ok(value)) => axum::Json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {"content": [{"type": "json", "json": value}]},
                })),
                Some(StubBehavior::Fail(code, message)) => axum::Json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": code, "message": message},
                })),
                None => axum::Json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32601, "message": format!("unknown tool: {name}")},
                })),
            }
        }
        _ => axum::Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32601, "message": "method not found"},
        })),
    }
}
