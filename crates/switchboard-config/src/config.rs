// crates/switchboard-config/src/config.rs
// ============================================================================
// Module: Switchboard Configuration
// Description: Configuration loading and validation for Switchboard.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: switchboard-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and count
//! limits. Missing or invalid configuration fails closed: there is no
//! permissive default for the credential trust anchor, and a policy file
//! that cannot be validated refuses to serve.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use switchboard_core::CallerId;
use switchboard_core::PolicyEntry;
use switchboard_core::PolicyTable;
use switchboard_core::ProviderName;
use switchboard_core::ToolSpecifier;
use switchboard_core::UpstreamTarget;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "switchboard.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "SWITCHBOARD_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum number of configured upstream providers.
pub(crate) const MAX_UPSTREAMS: usize = 64;
/// Maximum number of configured callers.
pub(crate) const MAX_CALLERS: usize = 256;
/// Maximum number of grants per caller.
pub(crate) const MAX_GRANTS_PER_CALLER: usize = 64;
/// Maximum number of tool names in one grant.
pub(crate) const MAX_TOOLS_PER_GRANT: usize = 256;
/// Maximum length of an upstream URL.
pub(crate) const MAX_URL_LENGTH: usize = 2048;
/// Maximum number of admin bearer tokens.
pub(crate) const MAX_ADMIN_TOKENS: usize = 16;
/// Maximum length of an admin bearer token.
pub(crate) const MAX_ADMIN_TOKEN_LENGTH: usize = 256;
/// Default maximum inbound request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Default upstream connect timeout in milliseconds.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1_000;
/// Default upstream request timeout in milliseconds.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
/// Default maximum upstream response size in bytes.
const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// Minimum upstream connect timeout in milliseconds.
pub(crate) const MIN_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum upstream connect timeout in milliseconds.
pub(crate) const MAX_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Minimum upstream request timeout in milliseconds.
pub(crate) const MIN_REQUEST_TIMEOUT_MS: u64 = 500;
/// Maximum upstream request timeout in milliseconds.
pub(crate) const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Switchboard proxy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SwitchboardConfig {
    /// Inbound server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Credential verification configuration. Required: there is no
    /// unauthenticated mode.
    pub auth: AuthConfig,
    /// Administrative endpoint configuration.
    #[serde(default)]
    pub admin: AdminConfig,
    /// Shared HTTP options for upstream calls.
    #[serde(default)]
    pub upstream_http: UpstreamHttpConfig,
    /// Upstream provider entries.
    #[serde(default)]
    pub upstreams: Vec<UpstreamConfig>,
    /// Per-caller policy entries.
    #[serde(default)]
    pub callers: Vec<CallerPolicyConfig>,
}

impl SwitchboardConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, then the `SWITCHBOARD_CONFIG`
    /// environment variable, then `switchboard.toml` in the working
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.auth.validate()?;
        self.admin.validate()?;
        self.upstream_http.validate()?;
        if self.upstreams.len() > MAX_UPSTREAMS {
            return Err(ConfigError::Invalid("too many upstreams".to_string()));
        }
        let mut names = std::collections::BTreeSet::new();
        for upstream in &self.upstreams {
            upstream.validate()?;
            if !names.insert(&upstream.name) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate upstream name: {}",
                    upstream.name
                )));
            }
        }
        if self.callers.len() > MAX_CALLERS {
            return Err(ConfigError::Invalid("too many callers".to_string()));
        }
        let mut callers = std::collections::BTreeSet::new();
        for caller in &self.callers {
            caller.validate()?;
            if !callers.insert(&caller.name) {
                return Err(ConfigError::Invalid(format!("duplicate caller: {}", caller.name)));
            }
        }
        Ok(())
    }

    /// Builds the immutable policy table from the caller entries.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a caller grants the same provider twice.
    pub fn policy_table(&self) -> Result<PolicyTable, ConfigError> {
        let mut table = PolicyTable::new();
        for caller in &self.callers {
            let entries = caller
                .grants
                .iter()
                .map(|grant| PolicyEntry {
                    provider: grant.provider.clone(),
                    tools: grant.tools.clone(),
                })
                .collect();
            table
                .insert(CallerId::from(caller.name.as_str()), entries)
                .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        }
        Ok(table)
    }

    /// Returns the configured upstream targets keyed by provider name.
    #[must_use]
    pub fn upstream_targets(&self) -> Vec<(ProviderName, UpstreamTarget)> {
        self.upstreams
            .iter()
            .map(|upstream| {
                (
                    upstream.name.clone(),
                    UpstreamTarget {
                        url: upstream.url.clone(),
                        bearer_token: upstream.bearer_token.clone(),
                        request_timeout_ms: upstream.request_timeout_ms,
                    },
                )
            })
            .collect()
    }
}

/// Resolves the configuration path from the argument, environment, or default.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    if let Ok(from_env) = env::var(CONFIG_ENV_VAR)
        && !from_env.trim().is_empty()
    {
        return PathBuf::from(from_env);
    }
    PathBuf::from(DEFAULT_CONFIG_NAME)
}

// ============================================================================
// SECTION: Server Configuration
// ============================================================================

/// Inbound server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        let _: SocketAddr = self
            .bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("server.bind must be a socket address".to_string()))?;
        Ok(())
    }
}

/// Default bind address.
fn default_bind() -> String {
    "127.0.0.1:9003".to_string()
}

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

// ============================================================================
// SECTION: Auth Configuration
// ============================================================================

/// Credential verification configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Path to the PEM-encoded RSA public key trusted for token signatures.
    pub public_key_path: PathBuf,
    /// Expected token issuer.
    pub issuer: String,
    /// Expected token audience.
    pub audience: String,
}

impl AuthConfig {
    /// Validates auth configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.public_key_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("auth.public_key_path must be set".to_string()));
        }
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.issuer must be set".to_string()));
        }
        if self.audience.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.audience must be set".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Admin Configuration
// ============================================================================

/// Administrative endpoint configuration.
///
/// An empty token list disables the endpoint entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// Static bearer tokens accepted on the admin endpoint.
    #[serde(default)]
    pub bearer_tokens: Vec<String>,
}

impl AdminConfig {
    /// Validates admin configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bearer_tokens.len() > MAX_ADMIN_TOKENS {
            return Err(ConfigError::Invalid("too many admin tokens".to_string()));
        }
        for token in &self.bearer_tokens {
            if token.is_empty() || token.len() > MAX_ADMIN_TOKEN_LENGTH {
                return Err(ConfigError::Invalid("invalid admin token length".to_string()));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Upstream Configuration
// ============================================================================

/// Shared HTTP options for upstream calls.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamHttpConfig {
    /// Connect timeout for upstream requests in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Request timeout for upstream requests in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum upstream response size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for UpstreamHttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl UpstreamHttpConfig {
    /// Validates shared upstream HTTP options.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CONNECT_TIMEOUT_MS..=MAX_CONNECT_TIMEOUT_MS).contains(&self.connect_timeout_ms) {
            return Err(ConfigError::Invalid(
                "upstream_http.connect_timeout_ms out of range".to_string(),
            ));
        }
        if !(MIN_REQUEST_TIMEOUT_MS..=MAX_REQUEST_TIMEOUT_MS).contains(&self.request_timeout_ms) {
            return Err(ConfigError::Invalid(
                "upstream_http.request_timeout_ms out of range".to_string(),
            ));
        }
        if self.max_response_bytes == 0 {
            return Err(ConfigError::Invalid(
                "upstream_http.max_response_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default upstream connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Default upstream request timeout.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

/// Default maximum upstream response size.
const fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

/// One upstream provider entry.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Provider name; also the tool name prefix on the wire.
    pub name: ProviderName,
    /// Provider JSON-RPC endpoint URL.
    pub url: String,
    /// Optional static bearer token presented to the provider.
    #[serde(default)]
    pub bearer_token: Option<String>,
    /// Allow plain-HTTP provider URLs (explicit opt-in).
    #[serde(default)]
    pub allow_insecure_http: bool,
    /// Optional per-provider request timeout override in milliseconds.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl UpstreamConfig {
    /// Validates one upstream entry.
    fn validate(&self) -> Result<(), ConfigError> {
        let url = self.url.trim();
        if url.is_empty() || url.len() > MAX_URL_LENGTH {
            return Err(ConfigError::Invalid(format!("invalid url for upstream {}", self.name)));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Invalid(format!(
                "upstream {} url must include http:// or https://",
                self.name
            )));
        }
        if url.starts_with("http://") && !self.allow_insecure_http {
            return Err(ConfigError::Invalid(format!(
                "upstream {} uses http:// without allow_insecure_http",
                self.name
            )));
        }
        if let Some(timeout) = self.request_timeout_ms
            && !(MIN_REQUEST_TIMEOUT_MS..=MAX_REQUEST_TIMEOUT_MS).contains(&timeout)
        {
            return Err(ConfigError::Invalid(format!(
                "upstream {} request_timeout_ms out of range",
                self.name
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Policy Configuration
// ============================================================================

/// Per-caller policy entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CallerPolicyConfig {
    /// Caller identifier, matched against the verified credential subject.
    pub name: String,
    /// Ordered grants; order is priority order.
    #[serde(default)]
    pub grants: Vec<GrantConfig>,
}

impl CallerPolicyConfig {
    /// Validates one caller entry.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("caller name must be set".to_string()));
        }
        if self.grants.len() > MAX_GRANTS_PER_CALLER {
            return Err(ConfigError::Invalid(format!("too many grants for caller {}", self.name)));
        }
        for grant in &self.grants {
            if let ToolSpecifier::Named(tools) = &grant.tools {
                if tools.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "caller {} grants an empty tool set for {}",
                        self.name, grant.provider
                    )));
                }
                if tools.len() > MAX_TOOLS_PER_GRANT {
                    return Err(ConfigError::Invalid(format!(
                        "caller {} grants too many tools for {}",
                        self.name, grant.provider
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One grant inside a caller policy.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantConfig {
    /// Granted provider name.
    pub provider: ProviderName,
    /// Tools allowed from the provider: `"*"` or an explicit list.
    pub tools: ToolSpecifier,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Filesystem error while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Semantic validation error.
    #[error("invalid config: {0}")]
    Invalid(String),
}
