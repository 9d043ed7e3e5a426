//! Read-only bridges to credentials managed by external tooling.
//!
//! Helpers surface tokens that already live in `git credential` storage or
//! in the `gh` CLI without latch ever persisting them. A helper failure is
//! never fatal to resolution: the manager logs it and moves on to the next
//! source.

pub mod gh;
pub mod git;

pub use gh::GhCliHelper;
pub use git::GitCredentialHelper;

use crate::error::AuthError;
use crate::model::{Credential, Platform};

/// A read-only credential source backed by an external tool.
pub trait CredentialHelper: Send + Sync {
  /// Short name used in log messages and [`AuthError::HelperFailure`].
  fn name(&self) -> &str;

  /// Whether the backing tool is installed and runnable.
  fn is_available(&self) -> bool;

  /// Ask the tool for a credential covering `repository` on `platform`.
  ///
  /// Fails with [`AuthError::HelperFailure`] when the tool has nothing for
  /// this host or cannot answer; callers treat that as "try the next
  /// source", not as a hard error.
  fn get_credential(&self, platform: Platform, repository: &str) -> Result<Credential, AuthError>;
}
