//! Registered Users
//!
//! A [`RegisteredUser`] is what the user store holds for each account. The
//! password itself is never kept: only a SHA-256 digest salted with the
//! username, compared in constant time on login.

use crate::storage::{Expiry, StorageEngine};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// What an authenticated user may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessLevel {
    /// Unrestricted access.
    Admin,
}

/// Operations a session performs on behalf of its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Write,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Read => f.write_str("read"),
            Operation::Write => f.write_str("write"),
            Operation::Delete => f.write_str("delete"),
        }
    }
}

/// A session's access level does not allow the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("access denied: {0} not permitted")]
pub struct AccessDenied(pub Operation);

impl AccessLevel {
    /// Whether this level allows `op`.
    pub fn permits(&self, op: Operation) -> bool {
        match self {
            AccessLevel::Admin => matches!(op, Operation::Read | Operation::Write | Operation::Delete),
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::Admin => f.write_str("admin"),
        }
    }
}

/// A salted SHA-256 password digest.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest([u8; 32]);

impl PasswordDigest {
    fn compute(username: &str, password: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((username.len() as u64).to_be_bytes());
        hasher.update(username.as_bytes());
        hasher.update(password.as_bytes());
        let result = hasher.finalize();

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&result);
        Self(digest)
    }

    /// Compares every byte regardless of where the first mismatch is.
    fn matches(&self, other: &PasswordDigest) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(<redacted>)")
    }
}

/// Stand-in digest checked when a login names no registered user.
const UNKNOWN_USER_DIGEST: PasswordDigest = PasswordDigest([0u8; 32]);

/// An account stored in the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    username: String,
    password: PasswordDigest,
    access: AccessLevel,
}

impl RegisteredUser {
    pub fn new(username: impl Into<String>, password: &str, access: AccessLevel) -> Self {
        let username = username.into();
        let password = PasswordDigest::compute(&username, password);
        Self {
            username,
            password,
            access,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn access(&self) -> AccessLevel {
        self.access
    }

    /// Checks a candidate password against the stored digest.
    pub fn verify(&self, password: &str) -> bool {
        self.password
            .matches(&PasswordDigest::compute(&self.username, password))
    }

    /// Rejects a login for a username that is not registered, after doing
    /// the same digest and compare as [`RegisteredUser::verify`].
    pub fn verify_unknown(username: &str, password: &str) -> bool {
        let attempt = PasswordDigest::compute(username, password);
        std::hint::black_box(UNKNOWN_USER_DIGEST.matches(&attempt));
        false
    }
}

/// Adds (or replaces) an account in the user store. The account never expires.
pub fn register_user(
    users: &StorageEngine<RegisteredUser>,
    username: &str,
    password: &str,
    access: AccessLevel,
) {
    let user = RegisteredUser::new(username, password, access);
    users.set(
        Bytes::copy_from_slice(username.as_bytes()),
        user,
        Some(Expiry::Never),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_unknown_always_rejects() {
        assert!(!RegisteredUser::verify_unknown("ghost", "s3cret"));
        assert!(!RegisteredUser::verify_unknown("", ""));
    }

    #[test]
    fn test_verify_password() {
        let user = RegisteredUser::new("admin", "s3cret", AccessLevel::Admin);

        assert!(user.verify("s3cret"));
        assert!(!user.verify("s3cre"));
        assert!(!user.verify("S3cret"));
        assert!(!user.verify(""));
    }

    #[test]
    fn test_digest_is_salted_by_username() {
        let a = RegisteredUser::new("alice", "same", AccessLevel::Admin);
        let b = RegisteredUser::new("bob", "same", AccessLevel::Admin);
        assert_ne!(a.password, b.password);
    }

    #[test]
    fn test_username_password_boundary_is_unambiguous() {
        // "ab" + "c" and "a" + "bc" must not collide
        let a = PasswordDigest::compute("ab", "c");
        let b = PasswordDigest::compute("a", "bc");
        assert!(!a.matches(&b));
    }

    #[test]
    fn test_debug_hides_digest() {
        let user = RegisteredUser::new("admin", "s3cret", AccessLevel::Admin);
        let debug = format!("{:?}", user);
        assert!(debug.contains("admin"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_admin_permits_everything() {
        for op in [Operation::Read, Operation::Write, Operation::Delete] {
            assert!(AccessLevel::Admin.permits(op));
        }
    }

    #[test]
    fn test_register_user() {
        let users = StorageEngine::default();
        register_user(&users, "admin", "pw", AccessLevel::Admin);

        let user = users.get(b"admin").unwrap();
        assert_eq!(user.username(), "admin");
        assert_eq!(user.access(), AccessLevel::Admin);
        assert!(user.verify("pw"));
    }
}
