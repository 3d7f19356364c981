//! Secret hashing and verification using Argon2.
//!
//! Uses the argon2id variant with default parameters. Hashes are stored in
//! PHC string format, salt included, so verification needs no side table.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

use crate::container::{Container, Role};

/// Errors from secret hashing and verification.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to hash secret: {0}")]
    Hash(String),

    #[error("stored secret hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hash a secret for storage.
pub fn hash_secret(secret: &str) -> Result<String, SecretError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SecretError::Hash(e.to_string()))
}

/// Verify a supplied secret against a stored PHC hash string.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool, SecretError> {
    let parsed = PasswordHash::new(hash).map_err(|e| SecretError::MalformedHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

/// Resolve the role a supplied secret earns on a container.
///
/// The admin hash is checked before the visitor hash. The order is load
/// bearing: when both secrets are the same literal string, the caller must
/// resolve to [`Role::Admin`].
pub fn match_secret(container: &Container, supplied: &str) -> Result<Option<Role>, SecretError> {
    if let Some(admin_hash) = &container.admin_secret_hash
        && verify_secret(supplied, admin_hash)?
    {
        return Ok(Some(Role::Admin));
    }
    if verify_secret(supplied, &container.visitor_secret_hash)? {
        return Ok(Some(Role::Visitor));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::container::AccessMode;
    use crate::types::ContainerId;

    #[test]
    fn hash_and_verify() {
        let secret = "correct-horse-battery-staple";
        let hash = hash_secret(secret).unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_secret(secret, &hash).unwrap());
        assert!(!verify_secret("wrong-secret", &hash).unwrap());
    }

    #[test]
    fn same_secret_different_salts() {
        let hash1 = hash_secret("same").unwrap();
        let hash2 = hash_secret("same").unwrap();
        assert_ne!(hash1, hash2);
        assert!(verify_secret("same", &hash1).unwrap());
        assert!(verify_secret("same", &hash2).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_secret("x", "not-a-phc-string"),
            Err(SecretError::MalformedHash(_))
        ));
    }

    fn split_container(visitor: &str, admin: &str) -> Container {
        let now = Utc::now();
        Container {
            id: ContainerId::generate(),
            name: "shared".into(),
            visitor_secret_hash: hash_secret(visitor).unwrap(),
            admin_secret_hash: Some(hash_secret(admin).unwrap()),
            access_mode: AccessMode::Split,
            max_views: 0,
            current_views: 0,
            files: Vec::new(),
            created_at: now,
            last_accessed_at: now,
            deleted: false,
        }
    }

    #[test]
    fn admin_hash_is_checked_first() {
        // Both secrets are the same literal; the match must resolve to admin.
        let c = split_container("hunter2", "hunter2");
        let role = match_secret(&c, "hunter2").unwrap();
        assert_eq!(role, Some(Role::Admin));
    }

    #[test]
    fn visitor_match_yields_visitor() {
        let c = split_container("read-pass", "write-pass");
        assert_eq!(match_secret(&c, "read-pass").unwrap(), Some(Role::Visitor));
        assert_eq!(match_secret(&c, "write-pass").unwrap(), Some(Role::Admin));
        assert_eq!(match_secret(&c, "neither").unwrap(), None);
    }
}
