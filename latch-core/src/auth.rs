//! The platform authenticator capability.
//!
//! One implementation exists per hosting platform (see the `latch-auth`
//! crate). The manager routes to an authenticator by [`Platform`] and only
//! invokes it once every non-interactive source (stores, helpers, SSH agent)
//! has been exhausted.

use crate::error::AuthError;
use crate::model::{AuthMethod, AuthRequest, AuthResult, Credential, Platform, TwoFactorChallenge, TwoFactorResponse};

/// Platform-specific login, token validation, refresh, and two-factor
/// handling.
pub trait Authenticator: Send + Sync {
  /// The platform this authenticator serves.
  fn platform(&self) -> Platform;

  /// The authentication methods the platform supports.
  fn supported_methods(&self) -> Vec<AuthMethod>;

  /// Perform the platform's login handshake. For the token method this
  /// prompts for and validates a pasted token; for ssh it defers to the
  /// agent. Implementations must fail with [`AuthError::NotAuthenticated`]
  /// when `request.interactive` is false and user input would be required.
  fn authenticate(&self, request: &AuthRequest) -> Result<AuthResult, AuthError>;

  /// Validate a token's shape and scopes.
  ///
  /// Fails with [`AuthError::InvalidFormat`] without any network call when
  /// the token is syntactically invalid; otherwise checks the required
  /// scopes are present, failing with [`AuthError::InsufficientScope`].
  fn validate_token(&self, token: &str, required_scopes: &[String]) -> Result<(), AuthError>;

  /// Exchange a refresh token for a fresh credential. Platforms without a
  /// refresh mechanism fail with [`AuthError::ExpiredToken`].
  fn refresh_token(&self, refresh_token: &str) -> Result<Credential, AuthError>;

  /// Carry out a second-factor challenge reported during login.
  fn handle_two_factor(&self, challenge: &TwoFactorChallenge) -> Result<TwoFactorResponse, AuthError>;
}
