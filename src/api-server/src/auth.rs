//! Bearer token authentication
//!
//! Verifies HS256-signed JWT bearer tokens and turns their claims into a
//! [`CallerIdentity`] for the access decision engine.
//!
//! # Claims
//! - `scp` - space-separated delegated scopes (optional)
//! - `roles` - application roles, string or array (optional)
//! - `oid` - object identifier (optional)
//! - `name` / `preferred_username` / `sub` - display name, first present wins
//! - `exp`, `nbf` - validated with [`AuthConfig::leeway_secs`] skew when present
//! - `aud`, `iss` - validated when configured

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{HeaderMap, AUTHORIZATION};
use axum::http::request::Parts;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Deserializer};
use sha2::Sha256;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use todolist_authz::CallerIdentity;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Default clock skew allowance in seconds
pub const DEFAULT_LEEWAY_SECS: i64 = 60;

/// Token verification settings
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC-SHA256 shared secret
    secret: Vec<u8>,
    /// Required `aud` value
    pub audience: Option<String>,
    /// Required `iss` value
    pub issuer: Option<String>,
    /// Allowed clock skew for `exp` / `nbf`
    pub leeway_secs: i64,
}

impl AuthConfig {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            audience: None,
            issuer: None,
            leeway_secs: DEFAULT_LEEWAY_SECS,
        }
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

/// Token verification failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("unsupported algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("invalid signature")]
    BadSignature,

    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    #[error("token expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("audience mismatch")]
    AudienceMismatch,

    #[error("issuer mismatch")]
    IssuerMismatch,

    #[error("token carries no name, preferred_username or sub claim")]
    MissingIdentity,
}

#[derive(Debug, Deserialize)]
struct TokenHeader {
    alg: String,
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    scp: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    roles: Vec<String>,
    oid: Option<String>,
    name: Option<String>,
    preferred_username: Option<String>,
    sub: Option<String>,
    exp: Option<i64>,
    nbf: Option<i64>,
    iss: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    aud: Vec<String>,
}

/// JWT allows `aud` and Azure AD allows `roles` as a single string or an array
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Verify a compact JWS and build the caller identity from its claims
pub fn verify_token(token: &str, config: &AuthConfig) -> Result<CallerIdentity, TokenError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed);
    };

    // 1. Header
    let header: TokenHeader = decode_segment(header_b64)?;
    if header.alg != "HS256" {
        return Err(TokenError::UnsupportedAlgorithm(header.alg));
    }

    // 2. Signature over "<header>.<payload>"
    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| TokenError::Malformed)?;
    let mut mac =
        HmacSha256::new_from_slice(config.secret()).map_err(|_| TokenError::BadSignature)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::BadSignature)?;

    // 3. Standard claims
    let claims: TokenClaims = decode_segment(payload_b64)?;
    let now = chrono::Utc::now().timestamp();

    if let Some(exp) = claims.exp {
        if now > exp.saturating_add(config.leeway_secs) {
            return Err(TokenError::Expired);
        }
    }
    if let Some(nbf) = claims.nbf {
        if now.saturating_add(config.leeway_secs) < nbf {
            return Err(TokenError::NotYetValid);
        }
    }
    if let Some(audience) = &config.audience {
        if !claims.aud.iter().any(|a| a == audience) {
            return Err(TokenError::AudienceMismatch);
        }
    }
    if let Some(issuer) = &config.issuer {
        if claims.iss.as_deref() != Some(issuer.as_str()) {
            return Err(TokenError::IssuerMismatch);
        }
    }

    // 4. Identity
    let name = claims
        .name
        .or(claims.preferred_username)
        .or(claims.sub)
        .ok_or(TokenError::MissingIdentity)?;

    let mut caller = CallerIdentity::new(name);
    caller.object_id = claims.oid;
    if let Some(scp) = &claims.scp {
        caller = caller.with_scope_claim(scp);
    }
    caller.roles.extend(claims.roles);

    Ok(caller)
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::InvalidClaims(e.to_string()))
}

/// Sign `claims` as an HS256 compact JWS
///
/// Used by tests and local tooling; the service itself only verifies tokens.
pub fn sign_token(claims: &serde_json::Value, secret: &[u8]) -> String {
    let header = serde_json::json!({ "alg": "HS256", "typ": "JWT" });
    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string().as_bytes());
    let payload_b64 = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    let signing_input = format!("{}.{}", header_b64, payload_b64);

    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();

    format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature))
}

/// Extract bearer token with HTTP-standard tolerance:
/// - Case-insensitive scheme ("Bearer", "bearer", "BEARER")
/// - Trim leading/trailing whitespace from header and token
pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = auth.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim()).filter(|t| !t.is_empty())
    } else {
        None
    }
}

/// Authenticated caller extractor
///
/// Rejects with 401 when the bearer token is missing or fails verification.
#[derive(Debug, Clone)]
pub struct Caller(pub CallerIdentity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_bearer_token(&parts.headers) else {
            warn!(path = %parts.uri.path(), "Missing bearer token");
            return Err(ApiError::unauthorized("Bearer token required"));
        };

        let caller = verify_token(token, &state.auth).map_err(|e| {
            warn!(path = %parts.uri.path(), error = %e, "Bearer token rejected");
            ApiError::unauthorized(format!("Invalid token: {}", e))
        })?;

        debug!(
            name = %caller.name,
            oid = ?caller.object_id,
            scopes = ?caller.scopes,
            roles = ?caller.roles,
            "Caller authenticated"
        );

        parts.extensions.insert(caller.clone());
        Ok(Caller(caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    const SECRET: &[u8] = b"test-secret-for-hs256-tokens";

    fn config() -> AuthConfig {
        AuthConfig::new(SECRET)
    }

    fn future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_verify_full_claims() {
        let token = sign_token(
            &json!({
                "name": "Alice",
                "oid": "oid-alice",
                "scp": "ToDo.Read ToDo.Write",
                "roles": ["Todo.Read.All"],
                "exp": future(),
            }),
            SECRET,
        );

        let caller = verify_token(&token, &config()).unwrap();
        assert_eq!(caller.name, "Alice");
        assert_eq!(caller.object_id.as_deref(), Some("oid-alice"));
        assert!(caller.has_scope("ToDo.Read"));
        assert!(caller.has_scope("ToDo.Write"));
        assert!(caller.has_role("Todo.Read.All"));
    }

    #[test]
    fn test_roles_as_single_string_and_absent_scope() {
        let token = sign_token(&json!({ "sub": "daemon", "roles": "Todo.Read.All" }), SECRET);

        let caller = verify_token(&token, &config()).unwrap();
        assert_eq!(caller.name, "daemon");
        assert!(caller.scopes.is_empty());
        assert!(caller.has_role("Todo.Read.All"));
    }

    #[test]
    fn test_name_fallback_order() {
        let token = sign_token(
            &json!({ "preferred_username": "alice@contoso.com", "sub": "abc" }),
            SECRET,
        );
        let caller = verify_token(&token, &config()).unwrap();
        assert_eq!(caller.name, "alice@contoso.com");

        let token = sign_token(&json!({ "oid": "x" }), SECRET);
        assert_eq!(
            verify_token(&token, &config()).unwrap_err(),
            TokenError::MissingIdentity
        );
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = sign_token(&json!({ "name": "alice" }), b"other-secret");
        assert_eq!(
            verify_token(&token, &config()).unwrap_err(),
            TokenError::BadSignature
        );
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let token = sign_token(&json!({ "name": "alice", "scp": "ToDo.Read" }), SECRET);
        let parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD
            .encode(json!({ "name": "alice", "roles": "Todo.Read.All" }).to_string());
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);

        assert_eq!(
            verify_token(&tampered, &config()).unwrap_err(),
            TokenError::BadSignature
        );
    }

    #[test]
    fn test_unsigned_token_is_rejected() {
        let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "none" }).to_string());
        let payload = URL_SAFE_NO_PAD.encode(json!({ "name": "alice" }).to_string());
        let token = format!("{}.{}.", header, payload);

        assert_eq!(
            verify_token(&token, &config()).unwrap_err(),
            TokenError::UnsupportedAlgorithm("none".to_string())
        );
    }

    #[test]
    fn test_expired_and_not_yet_valid() {
        let now = chrono::Utc::now().timestamp();

        let expired = sign_token(&json!({ "name": "a", "exp": now - 3600 }), SECRET);
        assert_eq!(verify_token(&expired, &config()).unwrap_err(), TokenError::Expired);

        let within_skew = sign_token(&json!({ "name": "a", "exp": now - 10 }), SECRET);
        assert!(verify_token(&within_skew, &config()).is_ok());

        let early = sign_token(&json!({ "name": "a", "nbf": now + 3600 }), SECRET);
        assert_eq!(verify_token(&early, &config()).unwrap_err(), TokenError::NotYetValid);
    }

    #[test]
    fn test_extreme_time_claims() {
        let far_future = sign_token(&json!({ "name": "a", "exp": i64::MAX }), SECRET);
        assert!(verify_token(&far_future, &config()).is_ok());

        let far_past = sign_token(&json!({ "name": "a", "nbf": i64::MIN }), SECRET);
        assert!(verify_token(&far_past, &config()).is_ok());

        let mut lenient = config();
        lenient.leeway_secs = i64::MAX;
        let never_before = sign_token(&json!({ "name": "a", "nbf": i64::MAX }), SECRET);
        assert!(verify_token(&never_before, &lenient).is_ok());
    }

    #[test]
    fn test_audience_and_issuer() {
        let config = config()
            .with_audience("api://todolist")
            .with_issuer("https://issuer.example");

        let good = sign_token(
            &json!({
                "name": "a",
                "aud": ["api://todolist", "other"],
                "iss": "https://issuer.example",
            }),
            SECRET,
        );
        assert!(verify_token(&good, &config).is_ok());

        let wrong_aud = sign_token(
            &json!({ "name": "a", "aud": "api://other", "iss": "https://issuer.example" }),
            SECRET,
        );
        assert_eq!(
            verify_token(&wrong_aud, &config).unwrap_err(),
            TokenError::AudienceMismatch
        );

        let wrong_iss = sign_token(
            &json!({ "name": "a", "aud": "api://todolist", "iss": "https://evil.example" }),
            SECRET,
        );
        assert_eq!(
            verify_token(&wrong_iss, &config).unwrap_err(),
            TokenError::IssuerMismatch
        );
    }

    #[test]
    fn test_malformed_tokens() {
        assert_eq!(verify_token("abc", &config()).unwrap_err(), TokenError::Malformed);
        assert_eq!(verify_token("a.b.c.d", &config()).unwrap_err(), TokenError::Malformed);
        assert_eq!(verify_token("!!.??.**", &config()).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn test_extract_bearer_token_tolerance() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("  bearer   abc.def.ghi  "));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", config());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("test-secret"));
    }
}
