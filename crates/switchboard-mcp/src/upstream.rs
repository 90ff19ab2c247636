// crates/switchboard-mcp/src/upstream.rs
// ============================================================================
// Module: Upstream HTTP Client
// Description: JSON-RPC 2.0 client for upstream tool providers.
// Purpose: Implement the engine's upstream seam over HTTP with reqwest.
// Dependencies: reqwest, serde_json, switchboard-core
// ============================================================================

//! ## Overview
//! One shared async HTTP client serves every upstream call. Requests carry
//! the provider-qualified tool name; responses are size-capped and parsed as
//! JSON-RPC even when the HTTP status signals failure, so a provider that is
//! itself an aggregating proxy keeps its error codes intact. A JSON-RPC
//! `-32601` answer is the recoverable "tool missing" signal; every other
//! failure is reported as terminal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use switchboard_config::UpstreamHttpConfig;
use switchboard_core::QualifiedToolName;
use switchboard_core::ToolDescriptor;
use switchboard_core::UpstreamClient;
use switchboard_core::UpstreamError;
use switchboard_core::UpstreamTarget;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON-RPC error code signalling an unimplemented method or tool.
const JSONRPC_METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC request id counter shared across upstream calls.
static JSON_RPC_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// SECTION: JSON-RPC Envelopes
// ============================================================================

/// JSON-RPC request envelope for upstream calls.
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: u64,
    /// Remote method name.
    method: &'static str,
    /// Request parameters payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl JsonRpcRequest {
    /// Builds a JSON-RPC request with a fresh identifier.
    fn new(method: &'static str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: JSON_RPC_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        }
    }
}

/// JSON-RPC response envelope for upstream calls.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    /// Successful result payload.
    result: Option<Value>,
    /// Error payload when the request fails.
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

/// Tool list response payload.
#[derive(Debug, Deserialize)]
struct ToolListResult {
    /// Tool descriptors exposed by the provider.
    tools: Vec<ToolDescriptor>,
}

/// Tool call parameters payload.
#[derive(Debug, Serialize)]
struct ToolCallParams {
    /// Provider-qualified tool name.
    name: String,
    /// Raw JSON arguments.
    arguments: Value,
}

/// Tool call response payload.
#[derive(Debug, Deserialize)]
struct ToolCallResult {
    /// Tool content variants emitted by the provider.
    content: Vec<ToolContent>,
}

/// Tool content variants for upstream responses.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// JSON result payload.
    Json {
        /// Result payload.
        json: Value,
    },
    /// Plain text payload.
    Text {
        /// Text content emitted by the provider.
        text: String,
    },
}

// ============================================================================
// SECTION: HTTP Client
// ============================================================================

/// Async JSON-RPC client over HTTP for all upstream providers.
#[derive(Debug)]
pub struct HttpUpstreamClient {
    /// Shared reqwest client with the connect timeout applied.
    client: reqwest::Client,
    /// Default request timeout.
    request_timeout: Duration,
    /// Maximum accepted response size in bytes.
    max_response_bytes: usize,
}

impl HttpUpstreamClient {
    /// Builds the shared upstream client from the HTTP options.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Protocol`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: &UpstreamHttpConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()
            .map_err(|_| UpstreamError::Protocol("http client build failed".to_string()))?;
        Ok(Self {
            client,
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            max_response_bytes: config.max_response_bytes,
        })
    }

    /// Executes one JSON-RPC exchange against a target.
    async fn exchange(
        &self,
        target: &UpstreamTarget,
        request: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, UpstreamError> {
        let timeout = target
            .request_timeout_ms
            .map_or(self.request_timeout, Duration::from_millis);
        let mut builder = self.client.post(&target.url).json(request).timeout(timeout);
        if let Some(token) = &target.bearer_token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status();
        let max_bytes = u64::try_from(self.max_response_bytes).unwrap_or(u64::MAX);
        if let Some(length) = response.content_length()
            && length > max_bytes
        {
            return Err(UpstreamError::Protocol("response too large".to_string()));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|_| UpstreamError::Unreachable("response read failed".to_string()))?;
        if bytes.len() > self.max_response_bytes {
            return Err(UpstreamError::Protocol("response too large".to_string()));
        }
        // Parse the body before judging the status: an aggregating provider
        // reports routable errors as JSON-RPC payloads on non-2xx statuses.
        match serde_json::from_slice::<JsonRpcResponse>(&bytes) {
            Ok(parsed) => Ok(parsed),
            Err(_) if status.is_success() => {
                Err(UpstreamError::Protocol("invalid json-rpc response".to_string()))
            }
            Err(_) => Err(UpstreamError::Unreachable(format!("http status {status}"))),
        }
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn list_tools(
        &self,
        target: &UpstreamTarget,
    ) -> Result<Vec<ToolDescriptor>, UpstreamError> {
        let request = JsonRpcRequest::new("tools/list", None);
        let response = self.exchange(target, &request).await?;
        if let Some(error) = response.error {
            return Err(UpstreamError::Call {
                code: error.code,
                message: error.message,
            });
        }
        let result = response
            .result
            .ok_or_else(|| UpstreamError::Protocol("missing list result".to_string()))?;
        let listed: ToolListResult = serde_json::from_value(result)
            .map_err(|_| UpstreamError::Protocol("invalid list result".to_string()))?;
        Ok(listed.tools)
    }

    async fn call_tool(
        &self,
        target: &UpstreamTarget,
        tool: &QualifiedToolName,
        arguments: Value,
    ) -> Result<Value, UpstreamError> {
        let params = ToolCallParams {
            name: tool.wire_name(),
            arguments,
        };
        let params = serde_json::to_value(params)
            .map_err(|_| UpstreamError::Protocol("request serialization failed".to_string()))?;
        let request = JsonRpcRequest::new("tools/call", Some(params));
        let response = self.exchange(target, &request).await?;
        if let Some(error) = response.error {
            if error.code == JSONRPC_METHOD_NOT_FOUND {
                return Err(UpstreamError::ToolMissing);
            }
            return Err(UpstreamError::Call {
                code: error.code,
                message: error.message,
            });
        }
        let result = response
            .result
            .ok_or_else(|| UpstreamError::Protocol("missing call result".to_string()))?;
        decode_call_result(result)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps reqwest send errors to stable upstream error messages.
fn map_send_error(error: reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::Unreachable("request timed out".to_string())
    } else if error.is_connect() {
        UpstreamError::Unreachable("connection failed".to_string())
    } else {
        UpstreamError::Unreachable("request failed".to_string())
    }
}

/// Extracts the payload from a tool call result envelope.
fn decode_call_result(result: Value) -> Result<Value, UpstreamError> {
    let call: ToolCallResult = serde_json::from_value(result)
        .map_err(|_| UpstreamError::Protocol("invalid call result".to_string()))?;
    let Some(content) = call.content.into_iter().next() else {
        return Err(UpstreamError::Protocol("empty call result".to_string()));
    };
    match content {
        ToolContent::Json {
            json,
        } => Ok(json),
        ToolContent::Text {
            text,
        } => Ok(Value::String(text)),
    }
}
