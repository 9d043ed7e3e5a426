//! OS keychain credential storage.
//!
//! Credentials are serialized to JSON and stored in the platform keychain
//! (macOS Keychain, Windows Credential Manager, or the Secret Service on
//! Linux) under the `latch` service. Keychains cannot enumerate entries for
//! a service, so a dedicated index entry tracks the accounts this store has
//! written; `list` and `clear` walk that index.

use std::collections::BTreeSet;

use keyring::Entry;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::model::{Credential, Platform};
use crate::store::{CredentialStore, storage_key};

const SERVICE: &str = "latch";
const INDEX_ACCOUNT: &str = "__index__";

/// Credential store backed by the operating system keychain.
pub struct KeychainStore {
  service: String,
}

impl Default for KeychainStore {
  fn default() -> Self {
    Self::new()
  }
}

impl KeychainStore {
  pub fn new() -> Self {
    Self {
      service: SERVICE.to_string(),
    }
  }

  /// Store under a non-default service name. Used by tests to avoid
  /// touching real entries.
  pub fn with_service(service: impl Into<String>) -> Self {
    Self {
      service: service.into(),
    }
  }

  fn entry(&self, account: &str) -> Result<Entry, AuthError> {
    Entry::new(&self.service, account)
      .map_err(|e| AuthError::StorageUnavailable(format!("keychain entry setup failed: {e}")))
  }

  /// Accounts this store has written, tracked in a dedicated index entry.
  fn read_index(&self) -> Result<BTreeSet<String>, AuthError> {
    let entry = self.entry(INDEX_ACCOUNT)?;
    match entry.get_password() {
      Ok(raw) => decode_index(&raw),
      Err(keyring::Error::NoEntry) => Ok(BTreeSet::new()),
      Err(e) => Err(AuthError::StorageUnavailable(format!("keychain read failed: {e}"))),
    }
  }

  fn write_index(&self, index: &BTreeSet<String>) -> Result<(), AuthError> {
    let entry = self.entry(INDEX_ACCOUNT)?;
    if index.is_empty() {
      match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(AuthError::StorageUnavailable(format!("keychain delete failed: {e}"))),
      }
    } else {
      entry
        .set_password(&encode_index(index)?)
        .map_err(|e| AuthError::StorageUnavailable(format!("keychain write failed: {e}")))
    }
  }
}

impl CredentialStore for KeychainStore {
  fn name(&self) -> &str {
    "keychain"
  }

  fn is_available(&self) -> bool {
    // A read probe exercises the whole keychain round trip without writing.
    // NoEntry still proves the backend answered.
    match Entry::new(&self.service, INDEX_ACCOUNT) {
      Ok(entry) => matches!(entry.get_password(), Ok(_) | Err(keyring::Error::NoEntry)),
      Err(_) => false,
    }
  }

  fn get(&self, platform: Platform, id: &str) -> Result<Credential, AuthError> {
    let account = storage_key(platform, id);
    let entry = self.entry(&account)?;
    match entry.get_password() {
      Ok(raw) => serde_json::from_str(&raw)
        .map_err(|e| AuthError::StorageUnavailable(format!("corrupt keychain entry for {account}: {e}"))),
      Err(keyring::Error::NoEntry) => Err(AuthError::NotFound {
        platform,
        id: id.to_string(),
      }),
      Err(e) => Err(AuthError::StorageUnavailable(format!("keychain read failed: {e}"))),
    }
  }

  fn set(&self, credential: &Credential) -> Result<(), AuthError> {
    let account = storage_key(credential.platform, &credential.id);
    let payload = serde_json::to_string(credential)
      .map_err(|e| AuthError::StorageUnavailable(format!("failed to encode credential: {e}")))?;

    self
      .entry(&account)?
      .set_password(&payload)
      .map_err(|e| AuthError::StorageUnavailable(format!("keychain write failed: {e}")))?;

    let mut index = self.read_index()?;
    if index.insert(account.clone()) {
      self.write_index(&index)?;
    }
    debug!(account = %account, "credential written to keychain");
    Ok(())
  }

  fn delete(&self, platform: Platform, id: &str) -> Result<(), AuthError> {
    let account = storage_key(platform, id);
    let entry = self.entry(&account)?;
    match entry.delete_credential() {
      Ok(()) => {}
      Err(keyring::Error::NoEntry) => {
        return Err(AuthError::NotFound {
          platform,
          id: id.to_string(),
        });
      }
      Err(e) => return Err(AuthError::StorageUnavailable(format!("keychain delete failed: {e}"))),
    }

    let mut index = self.read_index()?;
    if index.remove(&account) {
      self.write_index(&index)?;
    }
    Ok(())
  }

  fn list(&self) -> Result<Vec<Credential>, AuthError> {
    let index = self.read_index()?;
    let mut credentials = Vec::with_capacity(index.len());
    for account in index {
      let entry = self.entry(&account)?;
      match entry.get_password() {
        Ok(raw) => match serde_json::from_str(&raw) {
          Ok(credential) => credentials.push(credential),
          Err(e) => warn!(account = %account, "skipping corrupt keychain entry: {e}"),
        },
        // Index entries can go stale if another tool removed the underlying
        // keychain item; skip rather than fail the whole listing.
        Err(keyring::Error::NoEntry) => warn!(account = %account, "keychain index entry is stale"),
        Err(e) => return Err(AuthError::StorageUnavailable(format!("keychain read failed: {e}"))),
      }
    }
    Ok(credentials)
  }

  fn clear(&self) -> Result<(), AuthError> {
    let index = self.read_index()?;
    for account in &index {
      let entry = self.entry(account)?;
      match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => {}
        Err(e) => return Err(AuthError::StorageUnavailable(format!("keychain delete failed: {e}"))),
      }
    }
    self.write_index(&BTreeSet::new())
  }
}

fn encode_index(index: &BTreeSet<String>) -> Result<String, AuthError> {
  serde_json::to_string(index).map_err(|e| AuthError::StorageUnavailable(format!("failed to encode keychain index: {e}")))
}

fn decode_index(raw: &str) -> Result<BTreeSet<String>, AuthError> {
  serde_json::from_str(raw).map_err(|e| AuthError::StorageUnavailable(format!("corrupt keychain index: {e}")))
}

#[cfg(test)]
mod tests {
  use super::*;

  // The keychain itself is absent on CI hosts, so coverage here sticks to
  // the pure pieces; the backend round trip is covered manually on macOS
  // and Windows.

  #[test]
  fn test_index_round_trip() {
    let mut index = BTreeSet::new();
    index.insert("github/github.com".to_string());
    index.insert("gitlab/gitlab.example.com".to_string());

    let encoded = encode_index(&index).unwrap();
    assert_eq!(decode_index(&encoded).unwrap(), index);
  }

  #[test]
  fn test_decode_rejects_garbage() {
    assert!(matches!(decode_index("not json"), Err(AuthError::StorageUnavailable(_))));
  }

  #[test]
  fn test_account_naming() {
    assert_eq!(storage_key(Platform::Github, "github.com"), "github/github.com");
    assert_eq!(storage_key(Platform::Generic, "git.internal"), "generic/git.internal");
  }
}
