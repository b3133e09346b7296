//! Authentication-related models

use crate::auth::{LoginOutcome, UserProfile};
use serde::{Deserialize, Serialize};

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public user info
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub username: String,
    pub name: String,
}

impl From<UserProfile> for UserResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            username: profile.username,
            name: profile.display_name,
        }
    }
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub user: UserResponse,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            access_token: outcome.token.token,
            token_type: "bearer",
            expires_in: outcome.token.expires_in,
            user: UserResponse {
                username: outcome.identity.username,
                name: outcome.display_name,
            },
        }
    }
}
