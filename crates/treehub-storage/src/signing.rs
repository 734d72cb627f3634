//! HS256-signed blob URLs.
//!
//! A signed URL looks like `{base}/blobs/{key}?token={jwt}` where the token
//! binds the key, the permitted operation and an expiry. Whatever serves
//! `/blobs/*` calls [`UrlSigner::verify`] before touching the object.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use treehub_core::error::{AppError, ErrorKind};
use treehub_core::result::AppResult;
use treehub_core::traits::SignedUrlMethod;

/// Claims carried by a blob URL token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobClaims {
    /// Object key the token grants access to.
    pub key: String,
    /// Permitted operation.
    pub op: SignedUrlMethod,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// Issues and verifies blob URL tokens.
#[derive(Clone)]
pub struct UrlSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl UrlSigner {
    /// Create a signer with an HMAC secret and token lifetime.
    pub fn new(secret: &str, ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_seconds: i64::try_from(ttl_seconds).unwrap_or(i64::MAX),
        }
    }

    /// Sign a token for `op` on `key`.
    pub fn sign(&self, key: &str, op: SignedUrlMethod) -> AppResult<String> {
        let now = Utc::now();
        let claims = BlobClaims {
            key: key.to_string(),
            op,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.ttl_seconds)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            AppError::with_source(ErrorKind::Internal, "Failed to sign blob URL", e)
        })
    }

    /// Build a full signed URL under `base_url`.
    pub fn signed_url(&self, base_url: &str, key: &str, op: SignedUrlMethod) -> AppResult<String> {
        let token = self.sign(key, op)?;
        Ok(format!(
            "{}/blobs/{key}?token={token}",
            base_url.trim_end_matches('/')
        ))
    }

    /// Validate `token` and check it grants `op` on `key`.
    pub fn verify(&self, token: &str, key: &str, op: SignedUrlMethod) -> AppResult<BlobClaims> {
        let data = decode::<BlobClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::with_source(ErrorKind::Validation, "Invalid blob token", e))?;
        let claims = data.claims;
        if claims.key != key || claims.op != op {
            return Err(AppError::validation("Blob token does not grant this operation"));
        }
        Ok(claims)
    }
}
