//! Durable token persistence
//!
//! Tokens live under two stable keys. Both present is a session, anything else is
//! treated as no session at all.

use crate::config::SessionConfig;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;
use tokenward_core::TokenPair;

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserTokenStore;

/// Storage failures
#[derive(Debug, Error)]
pub enum StorageError {
    /// No storage backend is reachable
    #[error("Storage unavailable")]
    Unavailable,

    #[error("Failed to read {key}: {message}")]
    Read { key: String, message: String },

    #[error("Failed to write {key}: {message}")]
    Write { key: String, message: String },

    #[error("Failed to remove {key}: {message}")]
    Remove { key: String, message: String },
}

/// Persistence for the session's token pair
///
/// `save` and `clear` update both entries together; a `load` never returns half a pair.
pub trait TokenStore {
    fn load(&self) -> Result<Option<TokenPair>, StorageError>;
    fn save(&self, pair: &TokenPair) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

fn pair_from(access: Option<String>, refresh: Option<String>) -> Option<TokenPair> {
    match (access, refresh) {
        (Some(access), Some(refresh)) => Some(TokenPair { access, refresh }),
        _ => None,
    }
}

/// In-memory store keyed like the browser store
///
/// Clones share the same entries, so a test can keep a handle to inspect what the
/// session persisted.
#[derive(Clone)]
pub struct MemoryTokenStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
    access_key: String,
    refresh_key: String,
}

impl MemoryTokenStore {
    /// Create an empty store using the configured keys
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            entries: Rc::default(),
            access_key: config.access_token_key.clone(),
            refresh_key: config.refresh_token_key.clone(),
        }
    }

    /// Create a store already holding `pair`
    pub fn with_pair(config: &SessionConfig, pair: &TokenPair) -> Self {
        let store = Self::new(config);
        {
            let mut entries = store.entries.borrow_mut();
            entries.insert(store.access_key.clone(), pair.access.clone());
            entries.insert(store.refresh_key.clone(), pair.refresh.clone());
        }
        store
    }

    /// Raw value under `key`
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Write a single raw entry, bypassing the pair discipline
    pub fn set_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.borrow_mut().insert(key.into(), value.into());
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<TokenPair>, StorageError> {
        let entries = self.entries.borrow();
        Ok(pair_from(
            entries.get(&self.access_key).cloned(),
            entries.get(&self.refresh_key).cloned(),
        ))
    }

    fn save(&self, pair: &TokenPair) -> Result<(), StorageError> {
        let mut entries = self.entries.borrow_mut();
        entries.insert(self.access_key.clone(), pair.access.clone());
        entries.insert(self.refresh_key.clone(), pair.refresh.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut entries = self.entries.borrow_mut();
        entries.remove(&self.access_key);
        entries.remove(&self.refresh_key);
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::{StorageError, TokenStore, pair_from};
    use crate::config::SessionConfig;
    use tokenward_core::TokenPair;
    use web_sys::Storage;

    /// Store backed by `window.localStorage`
    pub struct BrowserTokenStore {
        access_key: String,
        refresh_key: String,
    }

    impl BrowserTokenStore {
        pub fn new(config: &SessionConfig) -> Self {
            Self {
                access_key: config.access_token_key.clone(),
                refresh_key: config.refresh_token_key.clone(),
            }
        }
    }

    /// Get localStorage
    fn get_local_storage() -> Result<Storage, StorageError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or(StorageError::Unavailable)
    }

    impl TokenStore for BrowserTokenStore {
        fn load(&self) -> Result<Option<TokenPair>, StorageError> {
            let storage = get_local_storage()?;
            let read = |key: &str| {
                storage.get_item(key).map_err(|e| StorageError::Read {
                    key: key.to_string(),
                    message: format!("{e:?}"),
                })
            };
            Ok(pair_from(read(&self.access_key)?, read(&self.refresh_key)?))
        }

        fn save(&self, pair: &TokenPair) -> Result<(), StorageError> {
            let storage = get_local_storage()?;
            storage
                .set_item(&self.access_key, &pair.access)
                .map_err(|e| StorageError::Write {
                    key: self.access_key.clone(),
                    message: format!("{e:?}"),
                })?;

            if let Err(e) = storage.set_item(&self.refresh_key, &pair.refresh) {
                // Never leave a new access token next to an old refresh token
                if let Err(rollback) = storage.remove_item(&self.access_key) {
                    warn!(
                        key = %self.access_key,
                        error = ?rollback,
                        "Failed to roll back access token; stored pair is incomplete"
                    );
                }
                return Err(StorageError::Write {
                    key: self.refresh_key.clone(),
                    message: format!("{e:?}"),
                });
            }
            Ok(())
        }

        fn clear(&self) -> Result<(), StorageError> {
            let storage = get_local_storage()?;
            let mut first_error = None;
            for key in [&self.access_key, &self.refresh_key] {
                if let Err(e) = storage.remove_item(key) {
                    first_error.get_or_insert(StorageError::Remove {
                        key: key.clone(),
                        message: format!("{e:?}"),
                    });
                }
            }
            first_error.map_or(Ok(()), Err)
        }
    }
}

// Mock implementation for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use mockall::mock;

    mock! {
        pub TokenStore {}

        impl TokenStore for TokenStore {
            fn load(&self) -> Result<Option<TokenPair>, StorageError>;
            fn save(&self, pair: &TokenPair) -> Result<(), StorageError>;
            fn clear(&self) -> Result<(), StorageError>;
        }
    }
}
