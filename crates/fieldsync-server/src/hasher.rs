// crates/fieldsync-server/src/hasher.rs
// ============================================================================
// Module: Argon2 Password Hasher
// Description: Adaptive password hashing backed by Argon2id.
// Purpose: Implement the core password hasher interface for deployments.
// Dependencies: argon2, fieldsync-core, rand
// ============================================================================

//! ## Overview
//! Digests are PHC strings (`$argon2id$v=19$...`) carrying their own salt and
//! parameters, so verification never needs out-of-band state. Plaintext
//! passwords are never logged or returned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use argon2::Argon2;
use argon2::PasswordHash;
use argon2::PasswordHasher as _;
use argon2::PasswordVerifier;
use argon2::password_hash::Error as PhcError;
use argon2::password_hash::SaltString;
use fieldsync_core::HasherError;
use fieldsync_core::PasswordDigest;
use fieldsync_core::PasswordHasher;
use rand::rngs::OsRng;

// ============================================================================
// SECTION: Hasher
// ============================================================================

/// Argon2id password hasher with default cost parameters.
///
/// # Invariants
/// - Every digest uses a fresh random salt.
#[derive(Default, Clone)]
pub struct Argon2PasswordHasher {
    /// Configured Argon2 context.
    argon2: Argon2<'static>,
}

impl Argon2PasswordHasher {
    /// Creates a hasher with the library's default Argon2id parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> Result<PasswordDigest, HasherError> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| HasherError::Hash(err.to_string()))?;
        Ok(PasswordDigest::new(digest.to_string()))
    }

    fn verify(&self, password: &str, digest: &PasswordDigest) -> Result<bool, HasherError> {
        let parsed =
            PasswordHash::new(digest.as_str()).map_err(|_| HasherError::MalformedDigest)?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PhcError::Password) => Ok(false),
            Err(err) => Err(HasherError::Hash(err.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use super::*;

    #[test]
    fn digests_verify_and_are_salted() {
        let hasher = Argon2PasswordHasher::new();
        let first = hasher.hash("correct horse").unwrap();
        let second = hasher.hash("correct horse").unwrap();
        assert_ne!(first.as_str(), second.as_str());
        assert!(first.as_str().starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &first).unwrap());
        assert!(!hasher.verify("wrong", &first).unwrap());
    }

    #[test]
    fn malformed_digest_is_reported() {
        let hasher = Argon2PasswordHasher::new();
        let err = hasher.verify("x", &PasswordDigest::new("not-a-phc-string")).unwrap_err();
        assert!(matches!(err, HasherError::MalformedDigest));
    }
}
