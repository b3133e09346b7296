//! Credential store: username → display name + password hash

use crate::{auth::password::PasswordHasher, error::AppError};
use std::collections::HashMap;
use thiserror::Error;

/// Development accounts shipped with the service: (username, display name, password)
pub const BUILTIN_ACCOUNTS: &[(&str, &str, &str)] = &[
    ("demo", "Demo User", "demo123"),
    ("admin", "Admin User", "admin123"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("no credential record for username")]
    NotFound,
}

/// Read-only lookup of credential records.
///
/// A database-backed store can implement this without touching the gateway.
pub trait CredentialStore: Send + Sync {
    fn lookup(&self, username: &str) -> Result<CredentialRecord, CredentialError>;
}

/// In-memory table fixed at startup
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    records: HashMap<String, CredentialRecord>,
}

impl StaticCredentialStore {
    /// Later records with the same username replace earlier ones.
    pub fn new(records: impl IntoIterator<Item = CredentialRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.username.clone(), record))
                .collect(),
        }
    }

    /// Hash the built-in development accounts with the given hasher
    pub fn with_builtin_accounts(hasher: &PasswordHasher) -> Result<Self, AppError> {
        let records = BUILTIN_ACCOUNTS
            .iter()
            .map(|(username, display_name, password)| {
                Ok(CredentialRecord {
                    username: username.to_string(),
                    display_name: display_name.to_string(),
                    password_hash: hasher.hash(password)?,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CredentialStore for StaticCredentialStore {
    fn lookup(&self, username: &str) -> Result<CredentialRecord, CredentialError> {
        self.records
            .get(username)
            .cloned()
            .ok_or(CredentialError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(username: &str, hash: &str) -> CredentialRecord {
        CredentialRecord {
            username: username.to_string(),
            display_name: format!("{} user", username),
            password_hash: hash.to_string(),
        }
    }

    #[test]
    fn test_lookup_found_and_missing() {
        let store = StaticCredentialStore::new(vec![record("demo", "h1"), record("admin", "h2")]);

        let found = store.lookup("demo").unwrap();
        assert_eq!(found.username, "demo");
        assert_eq!(found.password_hash, "h1");

        assert_eq!(store.lookup("ghost"), Err(CredentialError::NotFound));
        // Usernames are case sensitive
        assert_eq!(store.lookup("DEMO"), Err(CredentialError::NotFound));
    }

    #[test]
    fn test_duplicate_usernames_keep_last() {
        let store = StaticCredentialStore::new(vec![record("demo", "old"), record("demo", "new")]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("demo").unwrap().password_hash, "new");
    }

    #[test]
    fn test_builtin_accounts_are_hashed() {
        let hasher = PasswordHasher::with_cost(4).unwrap();
        let store = StaticCredentialStore::with_builtin_accounts(&hasher).unwrap();

        assert_eq!(store.len(), BUILTIN_ACCOUNTS.len());

        let demo = store.lookup("demo").unwrap();
        assert_eq!(demo.display_name, "Demo User");
        assert_ne!(demo.password_hash, "demo123");
        assert!(hasher.verify("demo123", &demo.password_hash));

        let admin = store.lookup("admin").unwrap();
        assert_eq!(admin.display_name, "Admin User");
        assert!(hasher.verify("admin123", &admin.password_hash));
    }
}
