//! Per-Connection Session
//!
//! A [`Session`] is the store facade one client connection talks to. It holds
//! references to the process-wide data and user stores and owns the
//! connection's authentication state, which is never shared with any other
//! session.

use crate::commands::Database;
use crate::security::user::{AccessDenied, AccessLevel, Operation, RegisteredUser};
use crate::storage::{Expiry, StorageEngine};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The user a session authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub access: AccessLevel,
}

/// Authentication-gated view over the shared stores.
///
/// Created unauthenticated when a connection is accepted and dropped when it
/// closes. Only a successful [`Session::authenticate`] sets its identity.
///
/// # Example
///
/// ```
/// use rqldb::security::{register_user, AccessLevel, RegisteredUser, Session};
/// use rqldb::storage::StorageEngine;
/// use bytes::Bytes;
/// use std::sync::Arc;
///
/// let data: Arc<StorageEngine<Bytes>> = Arc::new(StorageEngine::default());
/// let users: Arc<StorageEngine<RegisteredUser>> = Arc::new(StorageEngine::default());
/// register_user(&users, "admin", "s3cret", AccessLevel::Admin);
///
/// let mut session = Session::new(Arc::clone(&data), Arc::clone(&users));
/// assert!(!session.is_authenticated());
/// assert!(session.authenticate("admin", "s3cret"));
/// assert!(session.is_authenticated());
/// ```
#[derive(Debug)]
pub struct Session {
    store: Arc<StorageEngine<Bytes>>,
    users: Arc<StorageEngine<RegisteredUser>>,
    identity: Option<Identity>,
}

impl Session {
    pub fn new(store: Arc<StorageEngine<Bytes>>, users: Arc<StorageEngine<RegisteredUser>>) -> Self {
        Self {
            store,
            users,
            identity: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Checks `username`/`password` against the user store.
    ///
    /// On success the session becomes authenticated as that user. On failure
    /// the session keeps whatever identity it had before.
    pub fn authenticate(&mut self, username: &str, password: &str) -> bool {
        let user = self.users.get(username.as_bytes());
        let verified = match &user {
            Some(user) => user.verify(password),
            // Unknown names pay for a digest too
            None => RegisteredUser::verify_unknown(username, password),
        };

        let user = match user {
            Some(user) if verified => user,
            _ => {
                warn!(user = %username, "Authentication failed");
                return false;
            }
        };

        info!(user = %username, access = %user.access(), "Authenticated");
        self.identity = Some(Identity {
            username: user.username().to_string(),
            access: user.access(),
        });
        true
    }

    /// Access check for an operation.
    ///
    /// Unauthenticated sessions are not restricted; an authenticated session
    /// is held to its access level.
    fn authorize(&self, op: Operation) -> Result<(), AccessDenied> {
        match &self.identity {
            Some(identity) if !identity.access.permits(op) => {
                warn!(user = %identity.username, operation = %op, "Access denied");
                Err(AccessDenied(op))
            }
            _ => Ok(()),
        }
    }

    pub fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), AccessDenied> {
        self.authorize(Operation::Write)?;
        self.store
            .set(Bytes::copy_from_slice(key.as_bytes()), value, ttl.map(Expiry::After));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<Bytes>, AccessDenied> {
        self.authorize(Operation::Read)?;
        Ok(self.store.get(key.as_bytes()))
    }

    pub fn delete(&self, key: &str) -> Result<bool, AccessDenied> {
        self.authorize(Operation::Delete)?;
        Ok(self.store.delete(key.as_bytes()))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(identity) = &self.identity {
            debug!(user = %identity.username, "Session closed");
        }
    }
}

impl Database for Session {
    fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), AccessDenied> {
        Session::set(self, key, value, ttl)
    }

    fn get(&self, key: &str) -> Result<Option<Bytes>, AccessDenied> {
        Session::get(self, key)
    }

    fn delete(&self, key: &str) -> Result<bool, AccessDenied> {
        Session::delete(self, key)
    }

    fn authenticate(&mut self, username: &str, password: &str) -> bool {
        Session::authenticate(self, username, password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::user::register_user;
    use std::thread;

    fn stores() -> (Arc<StorageEngine<Bytes>>, Arc<StorageEngine<RegisteredUser>>) {
        let data: Arc<StorageEngine<Bytes>> = Arc::new(StorageEngine::new(Expiry::Never));
        let users: Arc<StorageEngine<RegisteredUser>> =
            Arc::new(StorageEngine::new(Expiry::Never));
        register_user(&users, "admin", "s3cret", AccessLevel::Admin);
        (data, users)
    }

    #[test]
    fn test_authenticate_success() {
        let (data, users) = stores();
        let mut session = Session::new(data, users);

        assert!(!session.is_authenticated());
        assert!(session.authenticate("admin", "s3cret"));
        assert!(session.is_authenticated());
        assert_eq!(
            session.identity(),
            Some(&Identity {
                username: "admin".to_string(),
                access: AccessLevel::Admin,
            })
        );
    }

    #[test]
    fn test_authenticate_wrong_password_leaves_state() {
        let (data, users) = stores();
        let mut session = Session::new(data, users);

        assert!(!session.authenticate("admin", "wrong"));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_authenticate_unknown_user() {
        let (data, users) = stores();
        let mut session = Session::new(data, users);

        assert!(!session.authenticate("nobody", "s3cret"));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_failed_attempt_keeps_prior_identity() {
        let (data, users) = stores();
        let mut session = Session::new(data, users);

        assert!(session.authenticate("admin", "s3cret"));
        assert!(!session.authenticate("admin", "wrong"));
        assert!(session.is_authenticated());
        assert_eq!(session.identity().unwrap().username, "admin");
    }

    #[test]
    fn test_unknown_user_keeps_prior_identity() {
        let (data, users) = stores();
        let mut session = Session::new(data, users);

        assert!(session.authenticate("admin", "s3cret"));
        assert!(!session.authenticate("ghost", "s3cret"));
        assert_eq!(session.identity().unwrap().username, "admin");
    }

    #[test]
    fn test_repeated_authentication() {
        let (data, users) = stores();
        let mut session = Session::new(data, users);

        assert!(session.authenticate("admin", "s3cret"));
        assert!(session.authenticate("admin", "s3cret"));
    }

    #[test]
    fn test_sessions_do_not_share_state() {
        let (data, users) = stores();
        let mut first = Session::new(Arc::clone(&data), Arc::clone(&users));
        let second = Session::new(data, users);

        assert!(first.authenticate("admin", "s3cret"));
        assert!(!second.is_authenticated());
    }

    #[test]
    fn test_admin_is_permitted_everything() {
        let (data, users) = stores();
        let mut session = Session::new(data, users);
        assert!(session.authenticate("admin", "s3cret"));

        for op in [Operation::Read, Operation::Write, Operation::Delete] {
            assert_eq!(session.authorize(op), Ok(()));
        }
        session.set("k", Bytes::from("v"), None).unwrap();
        assert_eq!(session.delete("k"), Ok(true));
    }

    #[test]
    fn test_data_access_is_not_gated() {
        let (data, users) = stores();
        let session = Session::new(data, users);

        session.set("k", Bytes::from("v"), None).unwrap();
        assert_eq!(session.get("k"), Ok(Some(Bytes::from("v"))));
        assert_eq!(session.delete("k"), Ok(true));
        assert_eq!(session.get("k"), Ok(None));
    }

    #[test]
    fn test_sessions_share_data() {
        let (data, users) = stores();
        let writer = Session::new(Arc::clone(&data), Arc::clone(&users));
        let reader = Session::new(Arc::clone(&data), users);

        writer.set("shared", Bytes::from("hello"), None).unwrap();
        assert_eq!(reader.get("shared"), Ok(Some(Bytes::from("hello"))));
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_ttl_passes_through() {
        let (data, users) = stores();
        let session = Session::new(data, users);

        session
            .set("k", Bytes::from("v"), Some(Duration::from_millis(20)))
            .unwrap();
        assert!(session.get("k").unwrap().is_some());
        thread::sleep(Duration::from_millis(50));
        assert!(session.get("k").unwrap().is_none());
    }

    #[test]
    fn test_concurrent_sessions_keep_every_write() {
        let (data, users) = stores();
        let mut handles = vec![];

        for i in 0..8 {
            let session = Session::new(Arc::clone(&data), Arc::clone(&users));
            handles.push(thread::spawn(move || {
                for j in 0..200 {
                    session
                        .set(&format!("s{}-k{}", i, j), Bytes::from("v"), None)
                        .unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(data.len(), 8 * 200);
    }
}
