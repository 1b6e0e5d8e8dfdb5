//! Explicit session handle for authenticated requests.
//!
//! The token lives behind a [`TokenStore`] capability that is handed to the
//! [`Session`]; nothing reads it from ambient global state.

use std::cell::RefCell;

use tracing::info;

use crate::api::ApiError;
use crate::store::{KeyValueStore, StoreError};

/// Key under which the session token is persisted.
pub const TOKEN_KEY: &str = "token";

pub trait TokenStore {
    fn read(&self) -> Result<Option<String>, StoreError>;
    fn write(&self, token: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

impl TokenStore for KeyValueStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        self.get(TOKEN_KEY)
    }

    fn write(&self, token: &str) -> Result<(), StoreError> {
        self.set(TOKEN_KEY, token)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.remove(TOKEN_KEY).map(|_| ())
    }
}

/// Volatile token store, used when nothing should touch the disk.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RefCell<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: RefCell::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.token.borrow().clone())
    }

    fn write(&self, token: &str) -> Result<(), StoreError> {
        *self.token.borrow_mut() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.token.borrow_mut().take();
        Ok(())
    }
}

pub struct Session {
    store: Box<dyn TokenStore>,
}

impl Session {
    pub fn new(store: Box<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Current token; `None` means logged out. Blank tokens count as absent.
    pub fn token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.store.read()?.filter(|t| !t.trim().is_empty()))
    }

    /// Token for an authenticated request. Fails before any request is
    /// built when logged out.
    pub fn bearer(&self) -> Result<String, ApiError> {
        self.token()?.ok_or(ApiError::MissingToken)
    }

    pub fn is_logged_in(&self) -> Result<bool, StoreError> {
        Ok(self.token()?.is_some())
    }

    pub fn sign_in(&self, token: &str) -> Result<(), StoreError> {
        self.store.write(token)?;
        info!("session token stored");
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), StoreError> {
        self.store.clear()?;
        info!("session token cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_session_lifecycle() {
        let session = Session::new(Box::new(MemoryTokenStore::default()));
        assert!(!session.is_logged_in().unwrap());

        session.sign_in("tok-1").unwrap();
        assert_eq!(session.token().unwrap().as_deref(), Some("tok-1"));

        session.sign_out().unwrap();
        assert_eq!(session.token().unwrap(), None);
    }

    #[test]
    fn test_blank_token_is_logged_out() {
        let session = Session::new(Box::new(MemoryTokenStore::with_token("  ")));
        assert!(!session.is_logged_in().unwrap());
        assert!(matches!(session.bearer(), Err(ApiError::MissingToken)));
    }

    #[test]
    fn test_sqlite_store_backs_session() {
        let session = Session::new(Box::new(KeyValueStore::open_in_memory().unwrap()));
        session.sign_in("persisted").unwrap();
        assert!(session.is_logged_in().unwrap());
        session.sign_out().unwrap();
        session.sign_out().unwrap();
        assert!(!session.is_logged_in().unwrap());
    }
}
