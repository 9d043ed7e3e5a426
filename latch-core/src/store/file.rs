//! Encrypted file-based credential storage.
//!
//! A single file holds the full credential set, encrypted with AES-256-GCM
//! under a key derived from a passphrase with Argon2id. Every write
//! re-serializes and re-encrypts the whole set and replaces the file via a
//! temp-file-then-rename so a crash never leaves a partially written file.
//! Decrypted buffers are zeroized as soon as they are dropped.
//!
//! The passphrase is sourced from the `LATCH_PASSPHRASE` environment variable
//! (or passed explicitly); there is no built-in default. Without a
//! passphrase the store reports unavailable.
//!
//! This store is the fallback for hosts where the OS keychain cannot be
//! reached; it is not the primary target.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::AuthError;
use crate::model::{Credential, Platform};
use crate::store::{CredentialStore, storage_key};

/// Environment variable supplying the file-store passphrase.
pub const PASSPHRASE_ENV: &str = "LATCH_PASSPHRASE";

/// On-disk format version.
const FILE_VERSION: u32 = 1;

/// Argon2id parameters (19 MiB, 2 iterations — the argon2 crate defaults).
const ARGON2_M_COST: u32 = 19_456;
const ARGON2_T_COST: u32 = 2;
const ARGON2_P_COST: u32 = 1;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Passphrase wrapper, zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct Passphrase(String);

/// Derived AES key, zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct EncryptionKey([u8; 32]);

/// The encrypted envelope serialized to disk. All byte fields are base64.
#[derive(Serialize, Deserialize)]
struct EncryptedFile {
  version: u32,
  salt: String,
  nonce: String,
  ciphertext: String,
}

/// Encrypted single-file credential store.
///
/// A mutex serializes the read-modify-write cycle within this process. The
/// full-file-rewrite pattern is not safe under concurrent writers from
/// multiple processes; a single active manager per machine is assumed.
pub struct EncryptedFileStore {
  path: PathBuf,
  passphrase: Option<Passphrase>,
  lock: Mutex<()>,
}

impl EncryptedFileStore {
  /// Create a store over `path` with an explicit passphrase.
  pub fn new(path: PathBuf, passphrase: impl Into<String>) -> Self {
    Self {
      path,
      passphrase: Some(Passphrase(passphrase.into())),
      lock: Mutex::new(()),
    }
  }

  /// Create a store over `path`, sourcing the passphrase from
  /// [`PASSPHRASE_ENV`]. A missing or empty variable leaves the store
  /// unavailable rather than falling back to any default.
  pub fn from_env(path: PathBuf) -> Self {
    let passphrase = std::env::var(PASSPHRASE_ENV)
      .ok()
      .filter(|value| !value.is_empty())
      .map(Passphrase);
    if passphrase.is_none() {
      debug!("{PASSPHRASE_ENV} is not set; encrypted file store will report unavailable");
    }
    Self {
      path,
      passphrase,
      lock: Mutex::new(()),
    }
  }

  pub fn path(&self) -> &PathBuf {
    &self.path
  }

  fn derive_key(&self, salt: &[u8]) -> Result<EncryptionKey, AuthError> {
    let passphrase = self
      .passphrase
      .as_ref()
      .ok_or_else(|| AuthError::StorageUnavailable(format!("no passphrase set; export {PASSPHRASE_ENV}")))?;

    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(32))
      .map_err(|e| AuthError::StorageUnavailable(format!("invalid key derivation parameters: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; 32];
    argon2
      .hash_password_into(passphrase.0.as_bytes(), salt, &mut key)
      .map_err(|e| AuthError::StorageUnavailable(format!("key derivation failed: {e}")))?;
    Ok(EncryptionKey(key))
  }

  /// Decrypt and deserialize the whole file. A missing file is an empty set.
  fn load(&self) -> Result<HashMap<String, Credential>, AuthError> {
    if !self.path.exists() {
      return Ok(HashMap::new());
    }

    let raw = fs::read_to_string(&self.path)
      .map_err(|e| AuthError::StorageUnavailable(format!("failed to read credential file: {e}")))?;
    let envelope: EncryptedFile = serde_json::from_str(&raw)
      .map_err(|e| AuthError::StorageUnavailable(format!("failed to parse credential file: {e}")))?;

    if envelope.version != FILE_VERSION {
      return Err(AuthError::StorageUnavailable(format!(
        "unsupported credential file version {} (expected {FILE_VERSION})",
        envelope.version
      )));
    }

    let salt = BASE64
      .decode(&envelope.salt)
      .map_err(|e| AuthError::StorageUnavailable(format!("corrupt salt field: {e}")))?;
    let nonce_bytes = BASE64
      .decode(&envelope.nonce)
      .map_err(|e| AuthError::StorageUnavailable(format!("corrupt nonce field: {e}")))?;
    if nonce_bytes.len() != NONCE_LEN {
      return Err(AuthError::StorageUnavailable(format!(
        "corrupt nonce field: expected {NONCE_LEN} bytes, got {}",
        nonce_bytes.len()
      )));
    }
    let ciphertext = BASE64
      .decode(&envelope.ciphertext)
      .map_err(|e| AuthError::StorageUnavailable(format!("corrupt ciphertext field: {e}")))?;

    let key = self.derive_key(&salt)?;
    let cipher = Aes256Gcm::new_from_slice(&key.0)
      .map_err(|e| AuthError::StorageUnavailable(format!("cipher setup failed: {e}")))?;

    // The GCM tag authenticates the ciphertext, so a wrong passphrase and a
    // tampered file are indistinguishable here.
    let plaintext = Zeroizing::new(
      cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| {
          AuthError::StorageUnavailable("failed to decrypt credential file (wrong passphrase or corrupted file)".to_string())
        })?,
    );

    serde_json::from_slice(&plaintext)
      .map_err(|e| AuthError::StorageUnavailable(format!("failed to decode credential file: {e}")))
  }

  /// Encrypt the full set under a fresh salt and nonce, then atomically
  /// replace the file.
  fn save(&self, entries: &HashMap<String, Credential>) -> Result<(), AuthError> {
    let plaintext = Zeroizing::new(
      serde_json::to_vec(entries)
        .map_err(|e| AuthError::StorageUnavailable(format!("failed to encode credentials: {e}")))?,
    );

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let key = self.derive_key(&salt)?;

    let cipher = Aes256Gcm::new_from_slice(&key.0)
      .map_err(|e| AuthError::StorageUnavailable(format!("cipher setup failed: {e}")))?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
      .encrypt(&nonce, plaintext.as_slice())
      .map_err(|e| AuthError::StorageUnavailable(format!("encryption failed: {e}")))?;

    let envelope = EncryptedFile {
      version: FILE_VERSION,
      salt: BASE64.encode(salt),
      nonce: BASE64.encode(nonce),
      ciphertext: BASE64.encode(&ciphertext),
    };
    let contents = serde_json::to_string_pretty(&envelope)
      .map_err(|e| AuthError::StorageUnavailable(format!("failed to encode credential file: {e}")))?;

    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)
        .map_err(|e| AuthError::StorageUnavailable(format!("failed to create credential directory: {e}")))?;
    }

    // Write-temp-then-rename so readers never observe a partial file.
    let file_name = self
      .path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| "credentials.enc".to_string());
    let tmp_path = self.path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp_path, contents)
      .map_err(|e| AuthError::StorageUnavailable(format!("failed to write credential file: {e}")))?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      let mut perms = fs::metadata(&tmp_path)
        .map_err(|e| AuthError::StorageUnavailable(format!("failed to read file metadata: {e}")))?
        .permissions();
      perms.set_mode(0o600); // Owner read/write only
      fs::set_permissions(&tmp_path, perms)
        .map_err(|e| AuthError::StorageUnavailable(format!("failed to set file permissions: {e}")))?;
    }

    fs::rename(&tmp_path, &self.path)
      .map_err(|e| AuthError::StorageUnavailable(format!("failed to replace credential file: {e}")))?;

    debug!(path = %self.path.display(), entries = entries.len(), "credential file rewritten");
    Ok(())
  }

  fn locked(&self) -> Result<std::sync::MutexGuard<'_, ()>, AuthError> {
    self
      .lock
      .lock()
      .map_err(|e| AuthError::StorageUnavailable(format!("file store lock poisoned: {e}")))
  }
}

impl CredentialStore for EncryptedFileStore {
  fn name(&self) -> &str {
    "file"
  }

  fn is_available(&self) -> bool {
    if self.passphrase.is_none() {
      return false;
    }
    match self.path.parent() {
      Some(parent) => parent.exists() || fs::create_dir_all(parent).is_ok(),
      None => false,
    }
  }

  fn get(&self, platform: Platform, id: &str) -> Result<Credential, AuthError> {
    let _guard = self.locked()?;
    let entries = self.load()?;
    entries
      .get(&storage_key(platform, id))
      .cloned()
      .ok_or_else(|| AuthError::NotFound {
        platform,
        id: id.to_string(),
      })
  }

  fn set(&self, credential: &Credential) -> Result<(), AuthError> {
    let _guard = self.locked()?;
    let mut entries = self.load()?;
    entries.insert(storage_key(credential.platform, &credential.id), credential.clone());
    self.save(&entries)
  }

  fn delete(&self, platform: Platform, id: &str) -> Result<(), AuthError> {
    let _guard = self.locked()?;
    let mut entries = self.load()?;
    if entries.remove(&storage_key(platform, id)).is_none() {
      return Err(AuthError::NotFound {
        platform,
        id: id.to_string(),
      });
    }
    self.save(&entries)
  }

  fn list(&self) -> Result<Vec<Credential>, AuthError> {
    let _guard = self.locked()?;
    Ok(self.load()?.into_values().collect())
  }

  fn clear(&self) -> Result<(), AuthError> {
    let _guard = self.locked()?;
    if self.path.exists() {
      fs::remove_file(&self.path)
        .map_err(|e| AuthError::StorageUnavailable(format!("failed to clear credential file: {e}")))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, Utc};
  use latch_test_utils::EnvVarGuard;
  use tempfile::TempDir;

  use super::*;
  use crate::model::AuthMethod;

  fn test_store(dir: &TempDir) -> EncryptedFileStore {
    EncryptedFileStore::new(dir.path().join("credentials.enc"), "test-passphrase")
  }

  fn token_credential(id: &str, token: &str) -> Credential {
    Credential::new(Platform::Github, id, AuthMethod::Token)
      .with_token(token)
      .with_username("alice")
  }

  #[test]
  fn test_set_then_get_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);

    let cred = token_credential("github.com", "ghp_roundtrip");
    store.set(&cred).unwrap();

    let fetched = store.get(Platform::Github, "github.com").unwrap();
    assert_eq!(fetched, cred);
  }

  #[test]
  fn test_persists_across_store_instances() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("credentials.enc");

    let writer = EncryptedFileStore::new(path.clone(), "pass");
    writer.set(&token_credential("github.com", "t1")).unwrap();

    let reader = EncryptedFileStore::new(path, "pass");
    let fetched = reader.get(Platform::Github, "github.com").unwrap();
    assert_eq!(fetched.token, "t1");
  }

  #[test]
  fn test_wrong_passphrase_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("credentials.enc");

    EncryptedFileStore::new(path.clone(), "correct")
      .set(&token_credential("github.com", "t1"))
      .unwrap();

    let wrong = EncryptedFileStore::new(path, "incorrect");
    let err = wrong.get(Platform::Github, "github.com").unwrap_err();
    assert!(matches!(err, AuthError::StorageUnavailable(_)));
  }

  #[test]
  fn test_tampered_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("credentials.enc");
    let store = EncryptedFileStore::new(path.clone(), "pass");
    store.set(&token_credential("github.com", "t1")).unwrap();

    // Flip bytes inside the base64 ciphertext field.
    let mut envelope: EncryptedFile = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let mut ciphertext = BASE64.decode(&envelope.ciphertext).unwrap();
    ciphertext[0] ^= 0xff;
    envelope.ciphertext = BASE64.encode(&ciphertext);
    fs::write(&path, serde_json::to_string(&envelope).unwrap()).unwrap();

    assert!(store.get(Platform::Github, "github.com").is_err());
  }

  #[test]
  fn test_delete_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    assert!(matches!(
      store.delete(Platform::Github, "github.com"),
      Err(AuthError::NotFound { .. })
    ));
  }

  #[test]
  fn test_delete_removes_entry_but_keeps_others() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    store.set(&token_credential("github.com", "t1")).unwrap();
    store.set(&token_credential("corp.github.com", "t2")).unwrap();

    store.delete(Platform::Github, "github.com").unwrap();
    assert!(store.get(Platform::Github, "github.com").is_err());
    assert_eq!(store.get(Platform::Github, "corp.github.com").unwrap().token, "t2");
  }

  #[test]
  fn test_clear_removes_the_file() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    store.set(&token_credential("github.com", "t1")).unwrap();
    store.clear().unwrap();
    assert!(!store.path().exists());
    assert!(store.list().unwrap().is_empty());
  }

  #[test]
  fn test_expired_credential_is_still_returned() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    let expired = token_credential("github.com", "t1").with_expiry(Utc::now() - Duration::hours(1));
    store.set(&expired).unwrap();

    assert!(store.get(Platform::Github, "github.com").unwrap().is_expired());
  }

  #[test]
  fn test_no_temp_file_left_behind() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    store.set(&token_credential("github.com", "t1")).unwrap();

    let leftovers: Vec<_> = fs::read_dir(dir.path())
      .unwrap()
      .filter_map(|entry| entry.ok())
      .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
      .collect();
    assert!(leftovers.is_empty());
  }

  #[test]
  #[cfg(unix)]
  fn test_file_has_owner_only_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    store.set(&token_credential("github.com", "t1")).unwrap();

    let mode = fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
  }

  #[test]
  fn test_plaintext_token_never_hits_disk() {
    let dir = TempDir::new().unwrap();
    let store = test_store(&dir);
    store.set(&token_credential("github.com", "ghp_supersecretvalue")).unwrap();

    let raw = fs::read_to_string(store.path()).unwrap();
    assert!(!raw.contains("ghp_supersecretvalue"));
  }

  #[test]
  fn test_from_env_without_passphrase_is_unavailable() {
    let _guard = EnvVarGuard::unset(PASSPHRASE_ENV);
    let dir = TempDir::new().unwrap();
    let store = EncryptedFileStore::from_env(dir.path().join("credentials.enc"));
    assert!(!store.is_available());
    assert!(matches!(
      store.set(&token_credential("github.com", "t1")),
      Err(AuthError::StorageUnavailable(_))
    ));
  }

  #[test]
  fn test_from_env_with_passphrase_is_available() {
    let _guard = EnvVarGuard::set(PASSPHRASE_ENV, "from-env-pass");
    let dir = TempDir::new().unwrap();
    let store = EncryptedFileStore::from_env(dir.path().join("credentials.enc"));
    assert!(store.is_available());

    store.set(&token_credential("github.com", "t1")).unwrap();
    assert_eq!(store.get(Platform::Github, "github.com").unwrap().token, "t1");
  }
}
