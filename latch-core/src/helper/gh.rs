//! GitHub CLI (`gh`) bridge.

use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::AuthError;
use crate::helper::CredentialHelper;
use crate::model::{AuthMethod, Credential, Platform, normalize_host};

const HELPER_NAME: &str = "gh-cli";

/// Helper that reuses the token `gh auth login` already stored.
pub struct GhCliHelper {
  binary: String,
}

impl Default for GhCliHelper {
  fn default() -> Self {
    Self::new()
  }
}

impl GhCliHelper {
  pub fn new() -> Self {
    Self {
      binary: "gh".to_string(),
    }
  }

  /// Use a specific gh binary. Used by tests to stub out gh.
  pub fn with_binary(binary: impl Into<String>) -> Self {
    Self {
      binary: binary.into(),
    }
  }

  fn auth_token(&self, host: &str) -> Result<String, AuthError> {
    let output = Command::new(&self.binary)
      .args(["auth", "token", "--hostname", host])
      .stdin(Stdio::null())
      .stderr(Stdio::null())
      .output()
      .map_err(|e| helper_failure(format!("failed to run gh: {e}")))?;
    if !output.status.success() {
      return Err(helper_failure(format!("gh is not logged in to {host}")));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
      return Err(helper_failure(format!("gh returned an empty token for {host}")));
    }
    Ok(token)
  }

  /// Best-effort login lookup; a missing username never fails resolution.
  fn current_login(&self) -> Option<String> {
    let output = Command::new(&self.binary)
      .args(["api", "user", "--jq", ".login"])
      .stdin(Stdio::null())
      .stderr(Stdio::null())
      .output()
      .ok()?;
    if !output.status.success() {
      return None;
    }
    let login = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!login.is_empty()).then_some(login)
  }
}

impl CredentialHelper for GhCliHelper {
  fn name(&self) -> &str {
    HELPER_NAME
  }

  fn is_available(&self) -> bool {
    Command::new(&self.binary)
      .arg("--version")
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status()
      .map(|status| status.success())
      .unwrap_or(false)
  }

  fn get_credential(&self, platform: Platform, repository: &str) -> Result<Credential, AuthError> {
    if platform != Platform::Github {
      return Err(helper_failure(format!("gh only serves github hosts, not {platform}")));
    }

    let host = normalize_host(repository);
    debug!(%host, "querying gh for a stored token");
    let token = self.auth_token(&host)?;

    let mut credential = Credential::new(platform, host, AuthMethod::Helper).with_token(token);
    if let Some(login) = self.current_login() {
      credential = credential.with_username(login);
    }
    Ok(credential)
  }
}

fn helper_failure(message: String) -> AuthError {
  AuthError::HelperFailure {
    helper: HELPER_NAME.to_string(),
    message,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rejects_non_github_platforms() {
    let helper = GhCliHelper::new();
    let err = helper.get_credential(Platform::Gitlab, "gitlab.com").unwrap_err();
    assert!(matches!(err, AuthError::HelperFailure { ref helper, .. } if helper == "gh-cli"));
  }

  #[test]
  fn test_missing_binary_is_a_helper_failure() {
    let helper = GhCliHelper::with_binary("/nonexistent/gh");
    assert!(!helper.is_available());
    let err = helper.get_credential(Platform::Github, "github.com").unwrap_err();
    assert!(matches!(err, AuthError::HelperFailure { .. }));
  }
}
