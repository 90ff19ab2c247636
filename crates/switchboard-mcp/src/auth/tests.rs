// crates/switchboard-mcp/src/auth/tests.rs
// ============================================================================
// Module: Auth Tests
// Description: Unit tests for bearer parsing and token verification.
// Purpose: Validate fail-closed credential handling.
// Dependencies: switchboard-mcp, jsonwebtoken
// ============================================================================

//! Credential verification unit tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions use unwrap for clarity."
)]

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use jsonwebtoken::Algorithm;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use serde::Serialize;

use super::AuthError;
use super::CallerAuthn;
use super::RequestContext;
use super::TokenVerifier;
use super::parse_bearer_token;
use super::token_fingerprint;

/// Test-only RSA key pair; never use outside tests.
const TEST_PRIVATE_PEM: &str = include_str!("../../tests/fixtures/test_private.pem");
/// Public half of the test key pair.
const TEST_PUBLIC_PEM: &str = include_str!("../../tests/fixtures/test_public.pem");

/// Issuer expected by the verifier under test.
const ISSUER: &str = "https://switchboard";
/// Audience expected by the verifier under test.
const AUDIENCE: &str = "switchboard-callers";

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    iss: String,
    aud: String,
    exp: i64,
    iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scopes: Option<Vec<String>>,
}

fn now() -> i64 {
    i64::try_from(SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()).unwrap()
}

fn claims(sub: &str, iss: &str, aud: &str, exp_offset: i64) -> TestClaims {
    TestClaims {
        sub: sub.to_string(),
        iss: iss.to_string(),
        aud: aud.to_string(),
        exp: now() + exp_offset,
        iat: now(),
        scope: None,
        scopes: None,
    }
}

fn sign(claims: &TestClaims) -> String {
    let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_PEM.as_bytes()).unwrap();
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &key).unwrap()
}

fn verifier() -> TokenVerifier {
    TokenVerifier::new(TEST_PUBLIC_PEM, ISSUER, AUDIENCE).unwrap()
}

fn context_with(token: &str) -> RequestContext {
    RequestContext::http(None, Some(format!("Bearer {token}")))
}

#[test]
fn parse_bearer_accepts_valid_header() {
    let token = parse_bearer_token(Some("Bearer abc.def.ghi")).unwrap();
    assert_eq!(token, "abc.def.ghi");
}

#[test]
fn parse_bearer_is_scheme_case_insensitive() {
    assert!(parse_bearer_token(Some("bearer abc")).is_ok());
}

#[test]
fn parse_bearer_rejects_missing_wrong_scheme_and_empty() {
    assert!(parse_bearer_token(None).is_err());
    assert!(parse_bearer_token(Some("Basic abc")).is_err());
    assert!(parse_bearer_token(Some("Bearer ")).is_err());
}

#[test]
fn parse_bearer_rejects_oversized_header() {
    let oversized = format!("Bearer {}", "a".repeat(9000));
    assert!(parse_bearer_token(Some(&oversized)).is_err());
}

#[test]
fn fingerprint_is_stable_and_not_the_token() {
    let fp = token_fingerprint("secret-token");
    assert_eq!(fp, token_fingerprint("secret-token"));
    assert_eq!(fp.len(), 64);
    assert!(!fp.contains("secret"));
}

#[test]
fn valid_token_yields_the_subject_identity() {
    let token = sign(&claims("agent-a", ISSUER, AUDIENCE, 3600));
    let identity = verifier().verify(&context_with(&token)).unwrap();
    assert_eq!(identity.id.as_str(), "agent-a");
    assert!(identity.scopes.is_empty());
}

#[test]
fn scope_string_claim_is_split_on_whitespace() {
    let mut claims = claims("agent-a", ISSUER, AUDIENCE, 3600);
    claims.scope = Some("list_tools call_tools".to_string());
    let token = sign(&claims);
    let identity = verifier().verify(&context_with(&token)).unwrap();
    assert_eq!(identity.scopes, vec!["list_tools", "call_tools"]);
}

#[test]
fn scope_array_claim_is_accepted() {
    let mut claims = claims("agent-a", ISSUER, AUDIENCE, 3600);
    claims.scopes = Some(vec!["call_tools".to_string()]);
    let token = sign(&claims);
    let identity = verifier().verify(&context_with(&token)).unwrap();
    assert_eq!(identity.scopes, vec!["call_tools"]);
}

#[test]
fn expired_token_is_rejected() {
    let token = sign(&claims("agent-a", ISSUER, AUDIENCE, -3600));
    let result = verifier().verify(&context_with(&token));
    assert!(matches!(result, Err(AuthError::Unauthenticated(_))));
}

#[test]
fn wrong_issuer_is_rejected() {
    let token = sign(&claims("agent-a", "https://intruder", AUDIENCE, 3600));
    assert!(verifier().verify(&context_with(&token)).is_err());
}

#[test]
fn wrong_audience_is_rejected() {
    let token = sign(&claims("agent-a", ISSUER, "other-service", 3600));
    assert!(verifier().verify(&context_with(&token)).is_err());
}

#[test]
fn garbage_token_is_rejected() {
    assert!(verifier().verify(&context_with("not.a.jwt")).is_err());
}

#[test]
fn missing_header_is_rejected_not_anonymous() {
    let context = RequestContext::http(None, None);
    let result = verifier().verify(&context);
    assert!(matches!(result, Err(AuthError::Unauthenticated(_))));
}

#[test]
fn invalid_public_key_fails_construction() {
    assert!(TokenVerifier::new("not a pem", ISSUER, AUDIENCE).is_err());
}
