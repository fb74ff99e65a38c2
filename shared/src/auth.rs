//! Token authentication against the backend.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::AuthError;
use crate::http::endpoints;

/// Username and password as typed by the user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// `/auth/token/` response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: Option<String>,
}

/// Claims we read from an access token. All optional: the backend may issue opaque tokens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiration (seconds since epoch)
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issued at
    #[serde(default)]
    pub iat: Option<i64>,
    /// `access` or `refresh`
    #[serde(default)]
    pub token_type: Option<String>,
    /// Backend user id; numeric or string depending on the user model
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
}

/// Bearer token issued by the backend. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token, rejecting empty strings.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Claims, if the token is a JWT.
    pub fn claims(&self) -> Option<TokenClaims> {
        decode_claims(&self.0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims()
            .and_then(|c| c.exp)
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    /// Opaque tokens are never considered expired; the backend will say so with a 401.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Decode JWT claims without verifying the signature.
///
/// The token is only ever sent back to the server that issued it, which does
/// the real validation. We read `exp` to tell the user when to log in again.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let token = token.strip_prefix("Bearer ").unwrap_or(token);

    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    // Signature is not checked, so any key will do
    let key = DecodingKey::from_secret(b"unused");

    decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .ok()
}

impl ApiClient {
    /// Exchange credentials for an access token. Never retries.
    pub async fn authenticate(
        &self,
        credentials: &Credentials,
        base_url: &str,
    ) -> Result<AccessToken, AuthError> {
        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });

        let response = self
            .post(base_url, endpoints::AUTH_TOKEN, None, body, self.timeouts().auth)
            .await
            .map_err(|e| {
                warn!(error = %e, "Token request failed");
                AuthError::from(e)
            })?;

        let response = response.ok().map_err(|e| {
            warn!(username = %credentials.username, error = %e, "Authentication rejected");
            AuthError::from(e)
        })?;

        let token = response
            .json::<TokenResponse>()
            .ok()
            .and_then(|r| r.access)
            .and_then(AccessToken::new)
            .ok_or(AuthError::MissingToken)?;

        info!(username = %credentials.username, "Authenticated");
        Ok(token)
    }
}
