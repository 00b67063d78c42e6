//! authentication collaborator interfaces
//!
//! Token issuance/verification and password hashing live outside this
//! crate; the flows here depend only on these traits. Claims are a typed
//! record with named fields, validated at the boundary, never an open
//! string-keyed map.

use serde::{Deserialize, Serialize};

use crate::errors::AuthError;
use crate::types::{Role, UserId};

/// typed session-token claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub subject_id: UserId,
    pub role: Role,
}

/// construction-time configuration for a token issuer implementation;
/// replaces any process-wide mutable secret
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl: chrono::Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, ttl: chrono::Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }
}

/// issues and verifies session tokens for typed claims
#[cfg_attr(test, mockall::automock)]
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, claims: &Claims) -> Result<String, AuthError>;

    fn verify(&self, token: &str) -> Result<Claims, AuthError>;
}

/// hashes and verifies passwords
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Ok when the password matches the stored hash
    fn verify(&self, hash: &str, password: &str) -> Result<(), AuthError>;
}
