//! Durable credential persistence backends.
//!
//! Two production stores exist: the OS keychain ([`KeychainStore`]) and an
//! encrypted file ([`EncryptedFileStore`]) used as a fallback when the
//! keychain is unreachable. [`MemoryStore`] backs tests and throwaway
//! sessions. The manager consults stores strictly in registration order.

pub mod file;
pub mod keychain;
pub mod memory;

pub use file::EncryptedFileStore;
pub use keychain::KeychainStore;
pub use memory::MemoryStore;

use crate::error::AuthError;
use crate::model::{Credential, Platform};

/// A keyed persistence backend for credentials.
///
/// Implementations must be safe for concurrent use from multiple threads
/// within one process. Expiry is not a store concern: stores return whatever
/// they hold, and the manager decides whether a credential is still valid.
pub trait CredentialStore: Send + Sync {
  /// Short name used in log messages ("keychain", "file", ...).
  fn name(&self) -> &str;

  /// Cheap, side-effect-free availability probe. Must not panic; a store
  /// that cannot tell returns false.
  fn is_available(&self) -> bool;

  /// Fetch the credential for `(platform, id)`. Fails with
  /// [`AuthError::NotFound`] when no entry exists.
  fn get(&self, platform: Platform, id: &str) -> Result<Credential, AuthError>;

  /// Idempotent upsert keyed by `(platform, id)`.
  fn set(&self, credential: &Credential) -> Result<(), AuthError>;

  /// Remove the entry for `(platform, id)`. Fails with
  /// [`AuthError::NotFound`] when no entry exists.
  fn delete(&self, platform: Platform, id: &str) -> Result<(), AuthError>;

  /// All credentials held by this store.
  fn list(&self) -> Result<Vec<Credential>, AuthError>;

  /// Remove every credential held by this store.
  fn clear(&self) -> Result<(), AuthError>;
}

/// Composite storage key shared by the store implementations.
pub(crate) fn storage_key(platform: Platform, id: &str) -> String {
  format!("{platform}/{id}")
}
