//! Password hashing with Argon2id.
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$...`), which carry their
//! own salt and cost parameters.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::PasswordError;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError(e.to_string()))
}

/// Check `password` against a PHC string produced by [`hash_password`].
///
/// Malformed stored hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        tracing::warn!("stored password hash is not a PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verify_roundtrip() {
        let hash = hash_password("thepriceisright").unwrap();
        assert!(verify_password("thepriceisright", &hash));
        assert!(!verify_password("thepriceiswrong", &hash));
    }

    #[test]
    fn test_hash_is_argon2id_phc_string() {
        let hash = hash_password("password123").unwrap();
        assert!(hash.starts_with("$argon2id$"), "got {hash}");
        assert_eq!(PasswordHash::new(&hash).unwrap().algorithm.as_str(), "argon2id");
    }

    #[test]
    fn test_same_password_different_salts() {
        let a = hash_password("password123").unwrap();
        let b = hash_password("password123").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("password123", &a));
        assert!(verify_password("password123", &b));
    }

    #[test]
    fn test_hash_does_not_contain_password() {
        let hash = hash_password("timmyturner").unwrap();
        assert!(!hash.contains("timmyturner"));
    }

    #[test]
    fn test_malformed_hash_rejected() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "no-separator"));
        assert!(!verify_password("x", "zz$zz"));
    }
}
