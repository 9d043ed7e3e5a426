//! In-memory credential store.
//!
//! Process-local storage with no persistence, used by tests and as a scratch
//! backend for sessions that must not touch the keychain or disk.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::AuthError;
use crate::model::{Credential, Platform};
use crate::store::{CredentialStore, storage_key};

/// Thread-safe map-backed store. Always available.
#[derive(Default)]
pub struct MemoryStore {
  entries: RwLock<HashMap<String, Credential>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CredentialStore for MemoryStore {
  fn name(&self) -> &str {
    "memory"
  }

  fn is_available(&self) -> bool {
    true
  }

  fn get(&self, platform: Platform, id: &str) -> Result<Credential, AuthError> {
    let entries = self
      .entries
      .read()
      .map_err(|e| AuthError::StorageUnavailable(format!("memory store lock poisoned: {e}")))?;
    entries
      .get(&storage_key(platform, id))
      .cloned()
      .ok_or_else(|| AuthError::NotFound {
        platform,
        id: id.to_string(),
      })
  }

  fn set(&self, credential: &Credential) -> Result<(), AuthError> {
    let mut entries = self
      .entries
      .write()
      .map_err(|e| AuthError::StorageUnavailable(format!("memory store lock poisoned: {e}")))?;
    entries.insert(storage_key(credential.platform, &credential.id), credential.clone());
    Ok(())
  }

  fn delete(&self, platform: Platform, id: &str) -> Result<(), AuthError> {
    let mut entries = self
      .entries
      .write()
      .map_err(|e| AuthError::StorageUnavailable(format!("memory store lock poisoned: {e}")))?;
    entries
      .remove(&storage_key(platform, id))
      .map(|_| ())
      .ok_or_else(|| AuthError::NotFound {
        platform,
        id: id.to_string(),
      })
  }

  fn list(&self) -> Result<Vec<Credential>, AuthError> {
    let entries = self
      .entries
      .read()
      .map_err(|e| AuthError::StorageUnavailable(format!("memory store lock poisoned: {e}")))?;
    Ok(entries.values().cloned().collect())
  }

  fn clear(&self) -> Result<(), AuthError> {
    let mut entries = self
      .entries
      .write()
      .map_err(|e| AuthError::StorageUnavailable(format!("memory store lock poisoned: {e}")))?;
    entries.clear();
    Ok(())
  }
}
