//! bcrypt password hashing.

use crate::errors::AppError;

/// bcrypt cost used for every stored password.
pub const WORK_FACTOR: u32 = 14;

/// Outcome of checking a password against a stored digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Match,
    Mismatch,
}

/// Hashes and verifies passwords.
///
/// Both operations are CPU-bound; async callers should run them on the
/// blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordAuthenticator {
    cost: u32,
}

impl Default for PasswordAuthenticator {
    fn default() -> Self {
        Self { cost: WORK_FACTOR }
    }
}

impl PasswordAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cheaper hashing for tests only.
    #[cfg(test)]
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            AppError::Internal("Password hashing failed".to_string())
        })
    }

    /// Check a password against a digest produced by [`Self::hash`].
    pub fn verify(&self, digest: &str, plaintext: &str) -> PasswordCheck {
        match bcrypt::verify(plaintext, digest) {
            Ok(true) => PasswordCheck::Match,
            Ok(false) => PasswordCheck::Mismatch,
            Err(e) => {
                tracing::warn!("Stored password digest is unreadable: {}", e);
                PasswordCheck::Mismatch
            }
        }
    }
}
