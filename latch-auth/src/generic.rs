//! Generic authenticator for unrecognized hosts.
//!
//! Self-hosted forges expose no API latch can assume, so this authenticator
//! never touches the network: it accepts any non-empty token the user
//! pastes and leaves real verification to the first fetch or push.

use latch_core::model::normalize_host;
use latch_core::{
  AuthError, AuthMethod, AuthRequest, AuthResult, Authenticator, Credential, Platform, TwoFactorChallenge,
  TwoFactorResponse,
};

use crate::{prompt_line, prompt_secret};

#[derive(Default)]
pub struct GenericAuthenticator;

impl GenericAuthenticator {
  pub fn new() -> Self {
    Self
  }
}

impl Authenticator for GenericAuthenticator {
  fn platform(&self) -> Platform {
    Platform::Generic
  }

  fn supported_methods(&self) -> Vec<AuthMethod> {
    vec![AuthMethod::Token, AuthMethod::Ssh, AuthMethod::Helper]
  }

  fn authenticate(&self, request: &AuthRequest) -> Result<AuthResult, AuthError> {
    if !request.interactive {
      return Err(AuthError::NotAuthenticated(
        "login to a generic host requires an interactive terminal".to_string(),
      ));
    }

    let host = normalize_host(&request.repository);
    let token = prompt_secret(&format!("Access token for {host}"))?;
    self.validate_token(&token, &request.scopes)?;

    let credential = Credential::new(Platform::Generic, host.clone(), AuthMethod::Token).with_token(token);
    Ok(AuthResult::resolved(
      credential,
      format!("stored a token for {host} (verified on first use)"),
    ))
  }

  fn validate_token(&self, token: &str, _required_scopes: &[String]) -> Result<(), AuthError> {
    if token.trim().is_empty() {
      return Err(AuthError::InvalidFormat("token is empty".to_string()));
    }
    if token.chars().any(char::is_whitespace) {
      return Err(AuthError::InvalidFormat("token contains whitespace".to_string()));
    }
    // No platform API to ask; scopes cannot be verified here.
    Ok(())
  }

  fn refresh_token(&self, _refresh_token: &str) -> Result<Credential, AuthError> {
    Err(AuthError::ExpiredToken(
      "generic host tokens cannot be refreshed; log in again".to_string(),
    ))
  }

  fn handle_two_factor(&self, challenge: &TwoFactorChallenge) -> Result<TwoFactorResponse, AuthError> {
    let code = prompt_line(&challenge.message)?;
    Ok(TwoFactorResponse {
      code,
      method: challenge.method,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validate_token_shape_only() {
    let authenticator = GenericAuthenticator::new();
    assert!(authenticator.validate_token("any-opaque-token", &[]).is_ok());
    assert!(authenticator.validate_token("ok-even-with-scopes", &["repo".to_string()]).is_ok());
    assert!(matches!(
      authenticator.validate_token("", &[]),
      Err(AuthError::InvalidFormat(_))
    ));
    assert!(matches!(
      authenticator.validate_token("has space", &[]),
      Err(AuthError::InvalidFormat(_))
    ));
  }

  #[test]
  fn test_non_interactive_authenticate_fails() {
    let authenticator = GenericAuthenticator::new();
    let request = AuthRequest::new(Platform::Generic, "git.example.com");
    assert!(matches!(
      authenticator.authenticate(&request),
      Err(AuthError::NotAuthenticated(_))
    ));
  }
}
