//! JWT token generation and validation
//! Stateless access tokens signed with a shared HS256 secret

use crate::{auth::clock::Clock, config::AppConfig, error::AppError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Signing algorithm for every token this service issues or accepts
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// JWT claims. Unknown fields are rejected on decode.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,
}

/// Why a token was rejected. Logged, never returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("signature or algorithm mismatch")]
    SignatureInvalid,

    #[error("token expired")]
    Expired,

    #[error("token malformed or missing required claims")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::SignatureInvalid,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    /// Seconds until the token expires
    pub expires_in: u64,
}

impl IssuedToken {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.claims.exp, 0)
    }
}

/// Issues and decodes access tokens
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        // Expiry is checked against the injected clock in `decode`
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
            clock,
        }
    }

    /// Create codec from config
    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        let secret = config.security.signing_secret();
        if secret.is_empty() {
            return Err(AppError::Config("JWT secret is empty".to_string()));
        }

        let minutes = i64::try_from(config.security.access_token_expire_minutes)
            .map_err(|_| AppError::Config("access token lifetime out of range".to_string()))?;

        Ok(Self::new(secret.as_bytes(), Duration::minutes(minutes), clock))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject` with the configured lifetime
    pub fn issue(&self, subject: &str) -> Result<IssuedToken, AppError> {
        self.issue_with_ttl(subject, self.ttl)
    }

    /// Issue a token for `subject` expiring `ttl` from now
    pub fn issue_with_ttl(&self, subject: &str, ttl: Duration) -> Result<IssuedToken, AppError> {
        let now = self.clock.now();
        let expiration = now + ttl;

        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        let token = encode(&Header::new(TOKEN_ALGORITHM), &claims, &self.encoding_key).map_err(
            |e| {
                tracing::error!("Failed to encode access token: {:?}", e);
                AppError::Internal(format!("Failed to encode access token: {}", e))
            },
        )?;

        Ok(IssuedToken {
            token,
            claims,
            expires_in: ttl.num_seconds().max(0) as u64,
        })
    }

    /// Validate and decode a token.
    ///
    /// Valid iff the signature matches, the claims have exactly the expected
    /// shape with a non-empty subject, and `exp` is strictly after now.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(TokenError::from)?
            .claims;

        if claims.sub.is_empty() {
            return Err(TokenError::Malformed);
        }

        if claims.exp <= self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
