//! Error taxonomy shared by every component of the credential subsystem.
//!
//! Store- and helper-level failures are recovered locally by the [`Manager`]
//! (it advances to the next registered backend); only exhaustion of all
//! backends surfaces one of these errors to the caller. Validation failures
//! ([`AuthError::InvalidFormat`], [`AuthError::InsufficientScope`]) are never
//! retried automatically, since retrying with the same token cannot succeed.
//!
//! [`Manager`]: crate::manager::Manager

use thiserror::Error;

use crate::model::Platform;

/// Failure kinds produced by stores, helpers, authenticators, and the manager.
///
/// Raw backend errors (keychain daemon failures, file I/O, crypto errors) are
/// wrapped into [`AuthError::StorageUnavailable`] rather than surfaced
/// verbatim.
#[derive(Debug, Error)]
pub enum AuthError {
  /// No matching credential in any store or helper.
  #[error("no credential found for {platform}/{id}")]
  NotFound { platform: Platform, id: String },

  /// Credential present but past its expiry, or the platform has no refresh
  /// mechanism.
  #[error("credential has expired: {0}")]
  ExpiredToken(String),

  /// Token failed syntactic validation; no network call was made.
  #[error("invalid token format: {0}")]
  InvalidFormat(String),

  /// Token is valid but missing one or more required scopes.
  #[error("token is missing required scopes: {}", missing.join(", "))]
  InsufficientScope { missing: Vec<String> },

  /// No storage backend reported available for a write, or a backend failed
  /// in a way the caller cannot distinguish further.
  #[error("credential storage unavailable: {0}")]
  StorageUnavailable(String),

  /// Resolution exhausted all non-interactive sources and interactive login
  /// was disallowed or rejected.
  #[error("not authenticated: {0}")]
  NotAuthenticated(String),

  /// An external helper reported available but failed to produce a
  /// credential. The manager treats this as a soft failure and falls back to
  /// the next helper.
  #[error("credential helper '{helper}' failed: {message}")]
  HelperFailure { helper: String, message: String },

  /// The platform requires a second factor to complete the login.
  #[error("two-factor authentication required")]
  TwoFactorRequired,

  /// A second-factor exchange was attempted and rejected.
  #[error("two-factor authentication failed: {0}")]
  TwoFactorFailed(String),

  /// Failure while talking to a platform API.
  #[error("network error: {0}")]
  Network(String),
}

impl AuthError {
  /// A short hint telling the user how to get unstuck, printed by the CLI
  /// layer alongside the error itself.
  pub fn remediation(&self) -> Option<&'static str> {
    match self {
      Self::NotFound { .. } | Self::NotAuthenticated(_) => {
        Some("run `latch login <repository>` to authenticate")
      }
      Self::ExpiredToken(_) => Some("run `latch login <repository>` to obtain a fresh credential"),
      Self::InvalidFormat(_) => Some("check that the token was pasted completely and has the expected prefix"),
      Self::InsufficientScope { .. } => Some("regenerate the token with the required scopes"),
      Self::StorageUnavailable(_) => {
        Some("check that the OS keychain is reachable, or set LATCH_PASSPHRASE to enable the encrypted file store")
      }
      Self::TwoFactorRequired => Some("use a personal access token, which bypasses two-factor login"),
      _ => None,
    }
  }

  /// True for failures the manager recovers from by advancing to the next
  /// registered backend.
  pub fn is_recoverable(&self) -> bool {
    matches!(self, Self::NotFound { .. } | Self::HelperFailure { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_not_found_display_includes_platform_and_id() {
    let err = AuthError::NotFound {
      platform: Platform::Github,
      id: "github.com".to_string(),
    };
    assert_eq!(err.to_string(), "no credential found for github/github.com");
  }

  #[test]
  fn test_insufficient_scope_lists_missing_scopes() {
    let err = AuthError::InsufficientScope {
      missing: vec!["repo".to_string(), "read:user".to_string()],
    };
    assert!(err.to_string().contains("repo, read:user"));
  }

  #[test]
  fn test_remediation_hints() {
    let not_found = AuthError::NotFound {
      platform: Platform::Generic,
      id: "example.com".to_string(),
    };
    assert!(not_found.remediation().unwrap().contains("latch login"));

    let network = AuthError::Network("timed out".to_string());
    assert!(network.remediation().is_none());
  }

  #[test]
  fn test_recoverable_classification() {
    assert!(
      AuthError::HelperFailure {
        helper: "git".to_string(),
        message: "no credential".to_string(),
      }
      .is_recoverable()
    );
    assert!(!AuthError::InvalidFormat("empty token".to_string()).is_recoverable());
  }
}
