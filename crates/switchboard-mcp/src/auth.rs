// crates/switchboard-mcp/src/auth.rs
// ============================================================================
// Module: Caller Authentication
// Description: Bearer credential verification for inbound proxy requests.
// Purpose: Turn a signed bearer token into a verified caller identity.
// Dependencies: jsonwebtoken, sha2, switchboard-config, switchboard-core
// ============================================================================

//! ## Overview
//! Every inbound request carries a signed bearer token. The verifier checks
//! the RS256 signature against the configured public key together with the
//! expiry, issuer, and audience claims, and yields the caller identity the
//! policy store is keyed by. All failures are fail-closed: a missing or
//! invalid credential is rejected, never downgraded to an anonymous caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::net::IpAddr;
use std::path::Path;

use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;
use serde::Deserialize;
use sha2::Digest;
use sha2::Sha256;
use switchboard_config::AuthConfig;
use switchboard_core::CallerId;
use switchboard_core::CallerIdentity;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted size of the authorization header.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request context used for authentication decisions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
    /// Authorization header value, if present.
    pub auth_header: Option<String>,
    /// Optional request identifier for auditing.
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Builds an HTTP request context.
    #[must_use]
    pub fn http(peer_ip: Option<IpAddr>, auth_header: Option<String>) -> Self {
        Self {
            peer_ip,
            auth_header,
            request_id: None,
        }
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication errors.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Missing, malformed, expired, or otherwise invalid credential.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
}

/// Verifier construction errors.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// Public key file could not be read.
    #[error("unable to read public key: {0}")]
    KeyUnreadable(String),
    /// Public key is not a valid RSA PEM.
    #[error("invalid rsa public key")]
    KeyInvalid,
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Credential verification interface for inbound requests.
pub trait CallerAuthn: Send + Sync {
    /// Verifies the request credential and yields the caller identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] when no valid credential is
    /// presented.
    fn verify(&self, ctx: &RequestContext) -> Result<CallerIdentity, AuthError>;
}

// ============================================================================
// SECTION: Token Claims
// ============================================================================

/// Claims extracted from a verified token.
///
/// Expiry, issuer, and audience are enforced by the validation settings and
/// therefore not read back out of the payload.
#[derive(Debug, Deserialize)]
struct TokenClaims {
    /// Credential subject; becomes the caller identifier.
    sub: String,
    /// Space-delimited scope string, as OAuth-style issuers emit.
    #[serde(default)]
    scope: Option<String>,
    /// Scope array, as list-emitting issuers use.
    #[serde(default)]
    scopes: Option<Vec<String>>,
}

impl TokenClaims {
    /// Collects granted scopes from either claim form.
    fn granted_scopes(&self) -> Vec<String> {
        if let Some(scope) = &self.scope {
            return scope.split_whitespace().map(ToString::to_string).collect();
        }
        self.scopes.clone().unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Token Verifier
// ============================================================================

/// RS256 bearer token verifier.
pub struct TokenVerifier {
    /// Trusted RSA public key.
    decoding_key: DecodingKey,
    /// Validation settings: algorithm, expiry, issuer, audience.
    validation: Validation,
}

impl TokenVerifier {
    /// Builds a verifier from a PEM-encoded public key and expected claims.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError`] when the key cannot be parsed.
    pub fn new(public_key_pem: &str, issuer: &str, audience: &str) -> Result<Self, VerifierError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|_| VerifierError::KeyInvalid)?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Builds a verifier from the auth configuration, reading the key file.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError`] when the key file is unreadable or invalid.
    pub fn from_config(config: &AuthConfig) -> Result<Self, VerifierError> {
        let pem = read_key_file(&config.public_key_path)?;
        Self::new(&pem, &config.issuer, &config.audience)
    }
}

impl CallerAuthn for TokenVerifier {
    fn verify(&self, ctx: &RequestContext) -> Result<CallerIdentity, AuthError> {
        let token = parse_bearer_token(ctx.auth_header.as_deref())?;
        let data = jsonwebtoken::decode::<TokenClaims>(&token, &self.decoding_key, &self.validation)
            .map_err(|err| AuthError::Unauthenticated(format!("invalid token: {err}")))?;
        if data.claims.sub.is_empty() {
            return Err(AuthError::Unauthenticated("token subject is empty".to_string()));
        }
        let scopes = data.claims.granted_scopes();
        Ok(CallerIdentity::new(CallerId::from(data.claims.sub.as_str()), scopes))
    }
}

/// Reads the PEM key file from disk.
fn read_key_file(path: &Path) -> Result<String, VerifierError> {
    fs::read_to_string(path).map_err(|err| VerifierError::KeyUnreadable(err.to_string()))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the bearer token from an authorization header value.
///
/// # Errors
///
/// Returns [`AuthError::Unauthenticated`] when the header is missing,
/// oversized, or not a bearer credential.
pub fn parse_bearer_token(auth_header: Option<&str>) -> Result<String, AuthError> {
    let header = auth_header
        .ok_or_else(|| AuthError::Unauthenticated("missing authorization".to_string()))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated("invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

/// Returns the sha256 fingerprint of a raw token for audit events.
///
/// The fingerprint, never the token, is what reaches the audit log.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
