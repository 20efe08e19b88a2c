// Stateless HMAC-SHA256 access tokens.
//
// Token format: {claims_b64}.{hmac_hex}
//
// claims_b64 is the URL-safe base64 (no padding) of the JSON-encoded Claims.
// The HMAC covers claims_b64 and is keyed with NEUTRALIZER_SESSION_SECRET.
// Nothing is stored server-side: a token is valid while its signature checks
// out and `exp` is in the future.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::Principal;

type HmacSha256 = Hmac<Sha256>;

/// Everything a token carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub principal: Principal,
    /// Issued-at, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
    /// Random token id so two tokens issued in the same second differ
    pub jti: String,
}

/// Why a bearer token was rejected. Every variant maps to 401.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Not authenticated")]
    Missing,
    #[error("Could not validate credentials")]
    Malformed,
    #[error("Could not validate credentials")]
    BadSignature,
    #[error("Token has expired")]
    Expired,
}

/// Issues and resolves access tokens with a single server secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: String,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Sign a new token for `principal`, valid for the configured TTL.
    pub fn issue(&self, principal: &Principal) -> String {
        self.issue_at(principal, Utc::now().timestamp())
    }

    fn issue_at(&self, principal: &Principal, now: i64) -> String {
        let mut nonce_bytes = [0u8; 8];
        rand::rng().fill_bytes(&mut nonce_bytes);

        let claims = Claims {
            principal: principal.clone(),
            iat: now,
            exp: now + self.ttl.num_seconds(),
            jti: hex::encode(nonce_bytes),
        };

        // Serializing a struct of strings, ints and bools cannot fail.
        let json = serde_json::to_vec(&claims).unwrap_or_default();
        let payload = URL_SAFE_NO_PAD.encode(json);
        let sig = self.sign(&payload);

        format!("{payload}.{sig}")
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn resolve(&self, token: &str) -> Result<Claims, TokenError> {
        self.resolve_at(token, Utc::now().timestamp())
    }

    fn resolve_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Missing);
        }

        let (payload, provided_sig) = token.split_once('.').ok_or(TokenError::Malformed)?;
        if payload.is_empty() || provided_sig.contains('.') {
            return Err(TokenError::Malformed);
        }

        let expected_sig = self.sign(payload);
        if !constant_time_eq(provided_sig, &expected_sig) {
            return Err(TokenError::BadSignature);
        }

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)?;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, payload: &str) -> String {
        // HMAC accepts keys of any length, so this never fails.
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.secret.as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
