//! The single active session.

use crate::CmdError;
use std::sync::RwLock;
use utils::util::timestamp;
use vfs::Credentials;

/// An authenticated session bound to one mounted partition.
#[derive(Clone, Debug)]
pub struct Session {
    pub creds: Credentials,
    pub mount_id: String,
    pub since: i64,
}

/// Holds at most one session at a time.
#[derive(Default)]
pub struct SessionManager {
    current: RwLock<Option<Session>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.current.read().unwrap().is_some()
    }

    /// Opens a session with already-validated credentials. A second
    /// session is rejected.
    pub fn login(&self, creds: Credentials, mount_id: &str) -> Result<(), CmdError> {
        let mut current = self.current.write().unwrap();
        if current.is_some() {
            return Err(CmdError::SessionActive);
        }
        *current = Some(Session {
            creds,
            mount_id: mount_id.to_owned(),
            since: timestamp(),
        });
        Ok(())
    }

    pub fn logout(&self) -> Result<(), CmdError> {
        let mut current = self.current.write().unwrap();
        if current.is_none() {
            return Err(CmdError::NoSession);
        }
        *current = None;
        Ok(())
    }

    pub fn current(&self) -> Option<Session> {
        self.current.read().unwrap().clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn one_session_at_a_time() {
        let sm = SessionManager::new();
        assert!(!sm.is_active());
        assert!(matches!(sm.logout(), Err(CmdError::NoSession)));

        sm.login(Credentials::root(), "841A").unwrap();
        assert!(sm.is_active());
        assert_eq!(sm.current().unwrap().mount_id, "841A");
        assert!(matches!(
            sm.login(Credentials::root(), "842A"),
            Err(CmdError::SessionActive)
        ));

        sm.logout().unwrap();
        assert!(!sm.is_active());
    }
}
