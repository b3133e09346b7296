//! Password hashing and verification
//! bcrypt by default, argon2id PHC strings optional

use crate::{config::SecurityConfig, error::AppError};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

/// bcrypt ignores input past this many bytes
pub const BCRYPT_MAX_PASSWORD_BYTES: usize = 72;

/// Algorithm used for newly created hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordScheme {
    Bcrypt,
    Argon2id,
}

impl PasswordScheme {
    pub fn parse(name: &str) -> Result<Self, AppError> {
        match name.to_lowercase().as_str() {
            "bcrypt" => Ok(Self::Bcrypt),
            "argon2id" => Ok(Self::Argon2id),
            other => Err(AppError::Config(format!("Unknown password scheme: {}", other))),
        }
    }
}

/// Password hasher with configurable parameters
pub struct PasswordHasher {
    scheme: PasswordScheme,
    bcrypt_cost: u32,
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// bcrypt with the library's default work factor
    pub fn new() -> Self {
        Self {
            scheme: PasswordScheme::Bcrypt,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            argon2: Argon2::default(),
        }
    }

    /// bcrypt with an explicit work factor (4..=31)
    pub fn with_cost(cost: u32) -> Result<Self, AppError> {
        if !(4..=31).contains(&cost) {
            return Err(AppError::Config(format!("bcrypt cost out of range: {}", cost)));
        }

        Ok(Self {
            bcrypt_cost: cost,
            ..Self::new()
        })
    }

    pub fn from_config(config: &SecurityConfig) -> Result<Self, AppError> {
        let mut hasher = Self::with_cost(config.bcrypt_cost)?;
        hasher.scheme = PasswordScheme::parse(&config.password_scheme)?;
        Ok(hasher)
    }

    pub fn with_scheme(mut self, scheme: PasswordScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn scheme(&self) -> PasswordScheme {
        self.scheme
    }

    /// Hash a password. The salt is random, so equal inputs give different strings.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        match self.scheme {
            PasswordScheme::Bcrypt if password.len() > BCRYPT_MAX_PASSWORD_BYTES => {
                Err(AppError::BadRequest(format!(
                    "Password must be at most {} bytes",
                    BCRYPT_MAX_PASSWORD_BYTES
                )))
            }
            PasswordScheme::Bcrypt => bcrypt::hash(password, self.bcrypt_cost).map_err(|e| {
                tracing::error!("Failed to hash password: {:?}", e);
                AppError::Internal(format!("Failed to hash password: {}", e))
            }),
            PasswordScheme::Argon2id => {
                let salt = SaltString::generate(&mut OsRng);

                let password_hash = self
                    .argon2
                    .hash_password(password.as_bytes(), &salt)
                    .map_err(|e| {
                        tracing::error!("Failed to hash password: {:?}", e);
                        AppError::Internal(format!("Failed to hash password: {}", e))
                    })?
                    .to_string();

                Ok(password_hash)
            }
        }
    }

    /// Verify a password against a stored hash.
    ///
    /// The scheme is read from the hash itself. Comparison is constant time in
    /// both libraries. Malformed hashes, and passwords bcrypt would truncate,
    /// verify as `false`.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        if hash.starts_with("$argon2") {
            let parsed_hash = match PasswordHash::new(hash) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::debug!("Failed to parse password hash: {:?}", e);
                    return false;
                }
            };

            return self
                .argon2
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok();
        }

        // 超长输入会被 bcrypt 截断，共享前缀的密码不能算作匹配
        if password.len() > BCRYPT_MAX_PASSWORD_BYTES {
            return false;
        }

        match bcrypt::verify(password, hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::debug!("Failed to parse password hash: {:?}", e);
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}
