//! One-way password hashing.

use anyhow::{Context, Result};

/// Adaptive cost used in production. Raising it transparently re-costs new
/// hashes; existing hashes keep their embedded cost and still verify.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Salted bcrypt hashing with a configurable cost factor.
///
/// The produced hash is self-describing (salt and cost embedded), so
/// verification needs no external parameters.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    #[must_use]
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plaintext password.
    ///
    /// # Errors
    /// Returns an error if the underlying bcrypt implementation fails
    /// (out-of-range cost, RNG failure).
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        bcrypt::hash(plaintext, self.cost).context("failed to hash password")
    }

    /// Verify a plaintext password against a stored hash.
    ///
    /// Never errors: a malformed or truncated hash verifies `false` rather
    /// than aborting the login flow.
    #[must_use]
    pub fn verify(&self, plaintext: &str, hashed: &str) -> bool {
        bcrypt::verify(plaintext, hashed).unwrap_or(false)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}
