//! `git credential fill` bridge.

use std::collections::HashMap;
use std::io::Write;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::AuthError;
use crate::helper::CredentialHelper;
use crate::model::{AuthMethod, Credential, Platform, normalize_host};

const HELPER_NAME: &str = "git-credential";

/// Helper that queries git's configured credential helpers via
/// `git credential fill`.
pub struct GitCredentialHelper {
  binary: String,
}

impl Default for GitCredentialHelper {
  fn default() -> Self {
    Self::new()
  }
}

impl GitCredentialHelper {
  pub fn new() -> Self {
    Self {
      binary: "git".to_string(),
    }
  }

  /// Use a specific git binary. Used by tests to stub out git.
  pub fn with_binary(binary: impl Into<String>) -> Self {
    Self {
      binary: binary.into(),
    }
  }

  fn fill(&self, host: &str) -> Result<String, AuthError> {
    let mut child = Command::new(&self.binary)
      .args(["credential", "fill"])
      // Never let git fall back to prompting on the terminal.
      .env("GIT_TERMINAL_PROMPT", "0")
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::null())
      .spawn()
      .map_err(|e| helper_failure(format!("failed to run git: {e}")))?;

    if let Some(stdin) = child.stdin.as_mut() {
      stdin
        .write_all(format!("protocol=https\nhost={host}\n\n").as_bytes())
        .map_err(|e| helper_failure(format!("failed to write to git: {e}")))?;
    }

    let output = child
      .wait_with_output()
      .map_err(|e| helper_failure(format!("git did not finish: {e}")))?;
    if !output.status.success() {
      return Err(helper_failure(format!("git credential fill exited with {}", output.status)));
    }
    String::from_utf8(output.stdout).map_err(|_| helper_failure("git produced non-UTF-8 output".to_string()))
  }
}

impl CredentialHelper for GitCredentialHelper {
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
    let host = normalize_host(repository);
    debug!(%host, "querying git credential helpers");

    let output = self.fill(&host)?;
    let (username, password) = parse_fill_output(&output)?;

    let mut credential = Credential::new(platform, host, AuthMethod::Helper).with_token(password);
    if let Some(username) = username {
      credential = credential.with_username(username);
    }
    Ok(credential)
  }
}

/// Parse the `key=value` lines `git credential fill` prints. The password is
/// required; the username is optional.
fn parse_fill_output(output: &str) -> Result<(Option<String>, String), AuthError> {
  let mut fields: HashMap<&str, &str> = HashMap::new();
  for line in output.lines() {
    if let Some((key, value)) = line.split_once('=') {
      fields.insert(key, value);
    }
  }

  let password = fields
    .get("password")
    .filter(|value| !value.is_empty())
    .ok_or_else(|| helper_failure("git returned no password for this host".to_string()))?;
  let username = fields
    .get("username")
    .filter(|value| !value.is_empty())
    .map(|value| value.to_string());

  Ok((username, password.to_string()))
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
  fn test_parse_fill_output_full() {
    let output = "protocol=https\nhost=github.com\nusername=alice\npassword=ghp_secret\n";
    let (username, password) = parse_fill_output(output).unwrap();
    assert_eq!(username.as_deref(), Some("alice"));
    assert_eq!(password, "ghp_secret");
  }

  #[test]
  fn test_parse_fill_output_password_only() {
    let (username, password) = parse_fill_output("password=tok\n").unwrap();
    assert!(username.is_none());
    assert_eq!(password, "tok");
  }

  #[test]
  fn test_parse_fill_output_missing_password() {
    let err = parse_fill_output("username=alice\n").unwrap_err();
    assert!(matches!(err, AuthError::HelperFailure { .. }));
  }

  #[test]
  fn test_parse_fill_output_empty_password() {
    assert!(parse_fill_output("password=\n").is_err());
  }

  #[test]
  fn test_parse_fill_output_value_containing_equals() {
    let (_, password) = parse_fill_output("password=a=b=c\n").unwrap();
    assert_eq!(password, "a=b=c");
  }
}
