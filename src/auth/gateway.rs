//! Auth gateway: password login and bearer-token authorization

use crate::{
    auth::{
        credentials::{CredentialError, CredentialRecord, CredentialStore},
        jwt::{IssuedToken, TokenCodec, TokenError},
        password::PasswordHasher,
    },
    error::AppError,
};
use std::sync::Arc;
use thiserror::Error;

/// Verified against when the username is unknown, so both failure paths hash once
const DUMMY_PASSWORD: &str = "timing-equalizer-not-a-real-password";

/// Identity attached to an authorized request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
}

/// Public profile of a stored account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub username: String,
    pub display_name: String,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub token: IssuedToken,
    pub identity: Identity,
    pub display_name: String,
}

/// Internal reason behind a rejected login or session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("unknown username")]
    NotFound,

    #[error("password verification failed")]
    VerificationFailure,

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl From<CredentialError> for AuthFailure {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::NotFound => AuthFailure::NotFound,
        }
    }
}

pub struct AuthGateway {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenCodec,
    dummy_hash: String,
}

impl AuthGateway {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        tokens: TokenCodec,
    ) -> Result<Self, AppError> {
        let dummy_hash = hasher.hash(DUMMY_PASSWORD)?;

        Ok(Self {
            store,
            hasher,
            tokens,
            dummy_hash,
        })
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    /// Check a username/password pair, keeping the internal failure reason
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<CredentialRecord, AuthFailure> {
        let record = match self.store.lookup(username) {
            Ok(record) => record,
            Err(e) => {
                let _ = self.hasher.verify(password, &self.dummy_hash);
                return Err(e.into());
            }
        };

        if !self.hasher.verify(password, &record.password_hash) {
            return Err(AuthFailure::VerificationFailure);
        }

        Ok(record)
    }

    /// Log in and mint an access token.
    ///
    /// Unknown users and wrong passwords both return `InvalidCredentials`.
    pub fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let record = match self.authenticate(username, password) {
            Ok(record) => record,
            Err(reason) => {
                tracing::info!(%username, %reason, "Login rejected");
                metrics::counter!("auth_login_total", "outcome" => "rejected").increment(1);
                return Err(AppError::InvalidCredentials);
            }
        };

        let token = self.tokens.issue(&record.username)?;

        tracing::info!(username = %record.username, "Login succeeded");
        metrics::counter!("auth_login_total", "outcome" => "success").increment(1);

        Ok(LoginOutcome {
            token,
            identity: Identity {
                username: record.username,
            },
            display_name: record.display_name,
        })
    }

    /// Validate a bearer token and return the caller's identity
    pub fn authorize(&self, token: &str) -> Result<Identity, AppError> {
        match self.tokens.decode(token) {
            Ok(claims) => Ok(Identity {
                username: claims.sub,
            }),
            Err(reason) => {
                tracing::debug!(%reason, "Token validation failed");
                metrics::counter!("auth_session_rejected_total", "reason" => token_reason(reason))
                    .increment(1);
                Err(AppError::InvalidSession)
            }
        }
    }

    /// Look up display details for an account
    pub fn profile(&self, username: &str) -> Option<UserProfile> {
        self.store.lookup(username).ok().map(|record| UserProfile {
            username: record.username,
            display_name: record.display_name,
        })
    }
}

fn token_reason(reason: TokenError) -> &'static str {
    match reason {
        TokenError::SignatureInvalid => "signature_invalid",
        TokenError::Expired => "expired",
        TokenError::Malformed => "malformed",
    }
}
