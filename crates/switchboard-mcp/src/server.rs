// crates/switchboard-mcp/src/server.rs
// ============================================================================
// Module: Proxy Server
// Description: JSON-RPC 2.0 HTTP server for the aggregation proxy.
// Purpose: Expose tools/list and tools/call behind credential verification.
// Dependencies: axum, switchboard-config, switchboard-core, tokio
// ============================================================================

//! ## Overview
//! The proxy server terminates the caller-facing JSON-RPC surface. Every
//! request is authenticated before any engine work happens; the aggregator
//! and router never see an unverified caller. A separate administrative
//! route registers additional upstream providers at runtime and is guarded
//! by its own static token list, disabled entirely when that list is empty.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use axum::routing::post;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use switchboard_config::SwitchboardConfig;
use switchboard_core::CatalogAggregator;
use switchboard_core::InvocationRouter;
use switchboard_core::PolicyStore;
use switchboard_core::ProviderName;
use switchboard_core::ProxyError;
use switchboard_core::ToolDescriptor;
use switchboard_core::UpstreamRegistry;
use switchboard_core::UpstreamTarget;

use crate::audit::ProxyAuditEvent;
use crate::audit::ProxyAuditSink;
use crate::audit::StderrAuditSink;
use crate::auth::CallerAuthn;
use crate::auth::RequestContext;
use crate::auth::TokenVerifier;
use crate::auth::parse_bearer_token;
use crate::auth::token_fingerprint;
use crate::upstream::HttpUpstreamClient;

// ============================================================================
// SECTION: Proxy Server
// ============================================================================

/// Proxy server instance.
pub struct ProxyServer {
    /// Bind address from configuration.
    bind: String,
    /// Shared request-handling state.
    state: Arc<ServerState>,
}

impl ProxyServer {
    /// Builds a proxy server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyServerError`] when initialization fails.
    pub fn from_config(config: &SwitchboardConfig) -> Result<Self, ProxyServerError> {
        config.validate().map_err(|err| ProxyServerError::Config(err.to_string()))?;
        let verifier = TokenVerifier::from_config(&config.auth)
            .map_err(|err| ProxyServerError::Init(err.to_string()))?;
        let table =
            config.policy_table().map_err(|err| ProxyServerError::Config(err.to_string()))?;
        let policies = Arc::new(PolicyStore::new(table));

        let registry = Arc::new(UpstreamRegistry::new());
        for (name, target) in config.upstream_targets() {
            registry.register(name, target);
        }

        let client = Arc::new(
            HttpUpstreamClient::new(&config.upstream_http)
                .map_err(|err| ProxyServerError::Init(err.to_string()))?,
        );

        let aggregator = CatalogAggregator::new(
            Arc::clone(&policies),
            Arc::clone(&registry),
            Arc::clone(&client) as Arc<dyn switchboard_core::UpstreamClient>,
        );
        let router = InvocationRouter::new(
            policies,
            Arc::clone(&registry),
            client as Arc<dyn switchboard_core::UpstreamClient>,
        );

        let state = Arc::new(ServerState {
            aggregator,
            router,
            authn: Arc::new(verifier),
            audit: Arc::new(StderrAuditSink),
            registry,
            admin_tokens: config.admin.bearer_tokens.iter().cloned().collect(),
            max_body_bytes: config.server.max_body_bytes,
        });
        Ok(Self {
            bind: config.server.bind.clone(),
            state,
        })
    }

    /// Binds the listener without serving yet.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyServerError`] when the bind address is invalid or in
    /// use.
    pub async fn bind(self) -> Result<BoundProxyServer, ProxyServerError> {
        let addr: SocketAddr = self
            .bind
            .parse()
            .map_err(|_| ProxyServerError::Config("invalid bind address".to_string()))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| ProxyServerError::Transport("bind failed".to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|_| ProxyServerError::Transport("bind failed".to_string()))?;
        let app = Router::new()
            .route("/rpc", post(handle_rpc))
            .route("/admin/upstreams", post(handle_admin))
            .with_state(self.state);
        Ok(BoundProxyServer {
            listener,
            app,
            local_addr,
        })
    }

    /// Binds and serves requests until the server fails.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ProxyServerError> {
        self.bind().await?.serve().await
    }
}

/// Proxy server with a bound listener.
pub struct BoundProxyServer {
    /// Bound TCP listener.
    listener: tokio::net::TcpListener,
    /// Assembled axum application.
    app: Router,
    /// Actual bound address.
    local_addr: SocketAddr,
}

impl BoundProxyServer {
    /// Returns the actual bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves requests until the server fails.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyServerError`] when the server fails.
    pub async fn serve(self) -> Result<(), ProxyServerError> {
        axum::serve(self.listener, self.app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|_| ProxyServerError::Transport("http server failed".to_string()))
    }
}

/// Shared server state for request handlers.
struct ServerState {
    /// Catalog aggregator.
    aggregator: CatalogAggregator,
    /// Invocation router.
    router: InvocationRouter,
    /// Inbound credential verifier.
    authn: Arc<dyn CallerAuthn>,
    /// Audit sink for security decisions.
    audit: Arc<dyn ProxyAuditSink>,
    /// Upstream registry, mutated only by the admin route.
    registry: Arc<UpstreamRegistry>,
    /// Static admin bearer tokens; empty disables the admin route.
    admin_tokens: BTreeSet<String>,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

// ============================================================================
// SECTION: JSON-RPC Envelopes
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier.
    id: Value,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Bare tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Tools visible to the caller, under bare names.
    tools: Vec<ToolDescriptor>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
struct ToolCallResult {
    /// Tool output content.
    content: Vec<ToolContent>,
}

/// Tool output payloads for JSON-RPC responses.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// JSON tool output.
    Json {
        /// JSON payload.
        json: Value,
    },
}

// ============================================================================
// SECTION: RPC Handling
// ============================================================================

/// Handles the caller-facing JSON-RPC endpoint.
async fn handle_rpc(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    if bytes.len() > state.max_body_bytes {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            axum::Json(error_response(Value::Null, -32070, "request body too large")),
        );
    }
    let request: JsonRpcRequest = match serde_json::from_slice(&bytes) {
        Ok(request) => request,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(error_response(Value::Null, -32600, "invalid json-rpc request")),
            );
        }
    };
    if request.jsonrpc != "2.0" {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(error_response(request.id, -32600, "invalid json-rpc version")),
        );
    }

    let auth_header =
        headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);
    let context =
        RequestContext::http(Some(peer.ip()), auth_header).with_request_id(request.id.to_string());

    let (status, response) = dispatch(&state, &context, request).await;
    (status, axum::Json(response))
}

/// Dispatches an authenticated JSON-RPC request to the engine.
async fn dispatch(
    state: &ServerState,
    context: &RequestContext,
    request: JsonRpcRequest,
) -> (StatusCode, JsonRpcResponse) {
    let identity = match state.authn.verify(context) {
        Ok(identity) => identity,
        Err(err) => {
            let fingerprint = parse_bearer_token(context.auth_header.as_deref())
                .ok()
                .map(|token| token_fingerprint(&token));
            state.audit.record(&ProxyAuditEvent::authn_denied(context, &err, fingerprint));
            return proxy_error_response(
                request.id,
                &ProxyError::Unauthenticated(err.to_string()),
            );
        }
    };

    match request.method.as_str() {
        "tools/list" => {
            let outcome = state.aggregator.list_tools_for(&identity).await;
            state.audit.record(&ProxyAuditEvent::listing(context, &identity, &outcome));
            let tools: Vec<ToolDescriptor> =
                outcome.tools.into_iter().map(|tool| tool.descriptor).collect();
            match serde_json::to_value(ToolListResult {
                tools,
            }) {
                Ok(value) => (StatusCode::OK, result_response(request.id, value)),
                Err(_) => proxy_error_response(request.id, &ProxyError::Serialization),
            }
        }
        "tools/call" => {
            let params = request.params.unwrap_or(Value::Null);
            let call: ToolCallParams = match serde_json::from_value(params) {
                Ok(call) => call,
                Err(_) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        error_response(request.id, -32602, "invalid tool params"),
                    );
                }
            };
            match state.router.invoke(&identity, &call.name, call.arguments).await {
                Ok(outcome) => {
                    state.audit.record(&ProxyAuditEvent::invocation_served(
                        context, &identity, &call.name, &outcome,
                    ));
                    match serde_json::to_value(ToolCallResult {
                        content: vec![ToolContent::Json {
                            json: outcome.result,
                        }],
                    }) {
                        Ok(value) => (StatusCode::OK, result_response(request.id, value)),
                        Err(_) => proxy_error_response(request.id, &ProxyError::Serialization),
                    }
                }
                Err(err) => {
                    state.audit.record(&ProxyAuditEvent::invocation_failed(
                        context, &identity, &call.name, &err,
                    ));
                    proxy_error_response(request.id, &err)
                }
            }
        }
        _ => (StatusCode::BAD_REQUEST, error_response(request.id, -32601, "method not found")),
    }
}

/// Builds a successful JSON-RPC response.
fn result_response(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

/// Builds a JSON-RPC error response.
fn error_response(id: Value, code: i64, message: &str) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.to_string(),
        }),
    }
}

/// Maps a proxy error onto an HTTP status and JSON-RPC error payload.
///
/// `ToolNotFound` keeps the `-32601` code so that a caller that is itself an
/// aggregating proxy can treat this server like any other provider.
fn proxy_error_response(id: Value, error: &ProxyError) -> (StatusCode, JsonRpcResponse) {
    let (status, code) = match error {
        ProxyError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, -32001),
        ProxyError::AccessDenied(_) => (StatusCode::FORBIDDEN, -32003),
        ProxyError::ToolNotFound(_) => (StatusCode::OK, -32601),
        ProxyError::UpstreamUnreachable {
            ..
        } => (StatusCode::BAD_GATEWAY, -32010),
        ProxyError::Provider {
            code, ..
        } => (StatusCode::OK, *code),
        ProxyError::UnknownProvider(_) | ProxyError::Internal(_) => (StatusCode::OK, -32050),
        ProxyError::Serialization => (StatusCode::OK, -32060),
    };
    let message = match error {
        // Provider errors travel verbatim; everything else is summarized.
        ProxyError::Provider {
            message, ..
        } => message.clone(),
        other => other.to_string(),
    };
    (
        status,
        JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
            }),
        },
    )
}

// ============================================================================
// SECTION: Admin Handling
// ============================================================================

/// Administrative registration request payload.
#[derive(Debug, Deserialize)]
struct AdminRegisterRequest {
    /// Provider name to register.
    name: ProviderName,
    /// Provider JSON-RPC endpoint URL.
    url: String,
    /// Optional static bearer token for the provider.
    #[serde(default)]
    bearer_token: Option<String>,
    /// Optional per-provider request timeout override in milliseconds.
    #[serde(default)]
    request_timeout_ms: Option<u64>,
}

/// Handles the operator-facing upstream registration endpoint.
async fn handle_admin(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    if state.admin_tokens.is_empty() {
        return (
            StatusCode::FORBIDDEN,
            axum::Json(serde_json::json!({"error": "admin interface disabled"})),
        );
    }
    let auth_header =
        headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);
    let token = match parse_bearer_token(auth_header.as_deref()) {
        Ok(token) if state.admin_tokens.contains(&token) => token,
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                axum::Json(serde_json::json!({"error": "unauthenticated"})),
            );
        }
    };
    if bytes.len() > state.max_body_bytes {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            axum::Json(serde_json::json!({"error": "request body too large"})),
        );
    }
    let request: AdminRegisterRequest = match serde_json::from_slice(&bytes) {
        Ok(request) => request,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                axum::Json(serde_json::json!({"error": format!("invalid request: {err}")})),
            );
        }
    };
    let url = request.url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(serde_json::json!({"error": "url must include http:// or https://"})),
        );
    }

    state.registry.register(
        request.name.clone(),
        UpstreamTarget {
            url: url.to_string(),
            bearer_token: request.bearer_token,
            request_timeout_ms: request.request_timeout_ms,
        },
    );
    state
        .audit
        .record(&ProxyAuditEvent::admin_registered(&request.name, url, token_fingerprint(&token)));
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({"registered": request.name.to_string()})),
    )
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Proxy server errors.
#[derive(Debug, thiserror::Error)]
pub enum ProxyServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
