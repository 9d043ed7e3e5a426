//! # Latch Platform Authenticators
//!
//! One [`Authenticator`] implementation per supported hosting platform.
//! Each knows its platform's token formats, how to validate a token against
//! the platform API, and how to run an interactive token-paste login. The
//! HTTP calls use blocking reqwest since authentication sits on the
//! interactive CLI path.

pub mod bitbucket;
pub mod generic;
pub mod github;
pub mod gitlab;
pub(crate) mod scopes;

pub use bitbucket::BitbucketAuthenticator;
pub use generic::GenericAuthenticator;
pub use github::GithubAuthenticator;
pub use gitlab::GitlabAuthenticator;

use latch_core::{AuthError, Authenticator, Platform};

/// User-Agent sent with every platform API call.
pub(crate) const USER_AGENT: &str = concat!("latch/", env!("CARGO_PKG_VERSION"));

/// Construct the authenticator for `platform` with production endpoints.
pub fn authenticator_for(platform: Platform) -> Box<dyn Authenticator> {
  match platform {
    Platform::Github => Box::new(GithubAuthenticator::new()),
    Platform::Gitlab => Box::new(GitlabAuthenticator::new()),
    Platform::Bitbucket => Box::new(BitbucketAuthenticator::new()),
    Platform::Generic => Box::new(GenericAuthenticator::new()),
  }
}

/// Prompt for a secret on the terminal. Fails with
/// [`AuthError::NotAuthenticated`] when no terminal is attached or the user
/// aborts.
pub(crate) fn prompt_secret(prompt: &str) -> Result<String, AuthError> {
  dialoguer::Password::new()
    .with_prompt(prompt)
    .allow_empty_password(false)
    .interact()
    .map_err(|e| AuthError::NotAuthenticated(format!("token prompt failed: {e}")))
}

/// Prompt for a visible line of input, used for second-factor codes.
pub(crate) fn prompt_line(prompt: &str) -> Result<String, AuthError> {
  dialoguer::Input::new()
    .with_prompt(prompt)
    .interact_text()
    .map_err(|e| AuthError::TwoFactorFailed(format!("code prompt failed: {e}")))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_authenticator_for_routes_by_platform() {
    for platform in [Platform::Github, Platform::Gitlab, Platform::Bitbucket, Platform::Generic] {
      assert_eq!(authenticator_for(platform).platform(), platform);
    }
  }
}
