//! SSH agent binding.
//!
//! Latch never reads private keys; it only asks the running agent whether it
//! holds identities. The `ssh` authentication method resolves to a marker
//! credential when the agent answers yes, and actual key exchange is left to
//! ssh itself at fetch/push time.

use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::AuthError;

/// One identity loaded in the agent, as reported by `ssh-add -l`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshIdentity {
  /// Key size in bits.
  pub bits: u32,
  /// Fingerprint, usually `SHA256:`-prefixed.
  pub fingerprint: String,
  /// Free-form comment, typically an email or file path.
  pub comment: String,
  /// Key algorithm, e.g. `ED25519` or `RSA`.
  pub key_type: String,
}

/// Access to a running SSH agent.
pub trait SshAgent: Send + Sync {
  /// Whether an agent is reachable at all.
  fn is_available(&self) -> bool;

  /// The identities currently loaded. An empty list means the agent is
  /// running but holds no keys.
  fn list_identities(&self) -> Result<Vec<SshIdentity>, AuthError>;

  /// Whether the agent could serve `host`. Agents offer every loaded key to
  /// every host, so the default answer is "any identity at all"; a smarter
  /// binding could consult the ssh config.
  fn has_identity_for(&self, _host: &str) -> Result<bool, AuthError> {
    Ok(!self.list_identities()?.is_empty())
  }
}

/// Agent access via the `SSH_AUTH_SOCK` socket and the `ssh-add` binary.
pub struct DefaultSshAgent {
  binary: String,
}

impl Default for DefaultSshAgent {
  fn default() -> Self {
    Self::new()
  }
}

impl DefaultSshAgent {
  pub fn new() -> Self {
    Self {
      binary: "ssh-add".to_string(),
    }
  }
}

impl SshAgent for DefaultSshAgent {
  fn is_available(&self) -> bool {
    std::env::var("SSH_AUTH_SOCK").map(|sock| !sock.is_empty()).unwrap_or(false)
  }

  fn list_identities(&self) -> Result<Vec<SshIdentity>, AuthError> {
    if !self.is_available() {
      return Err(AuthError::NotAuthenticated(
        "no SSH agent is running (SSH_AUTH_SOCK is not set)".to_string(),
      ));
    }

    let output = Command::new(&self.binary)
      .arg("-l")
      .stdin(Stdio::null())
      .stderr(Stdio::null())
      .output()
      .map_err(|e| AuthError::NotAuthenticated(format!("failed to run ssh-add: {e}")))?;

    // ssh-add exits 1 when the agent is running but has no identities, and
    // 2 when it cannot reach the agent at all.
    match output.status.code() {
      Some(0) => {
        let listing = String::from_utf8_lossy(&output.stdout);
        let identities = parse_identities(&listing);
        debug!(count = identities.len(), "ssh agent identities listed");
        Ok(identities)
      }
      Some(1) => Ok(Vec::new()),
      _ => Err(AuthError::NotAuthenticated("could not connect to the SSH agent".to_string())),
    }
  }
}

/// Parse `ssh-add -l` output. Lines look like
/// `256 SHA256:AbCd... user@host (ED25519)`; malformed lines are skipped.
fn parse_identities(listing: &str) -> Vec<SshIdentity> {
  listing
    .lines()
    .filter_map(|line| {
      let mut parts = line.split_whitespace();
      let bits = parts.next()?.parse().ok()?;
      let fingerprint = parts.next()?.to_string();
      let rest: Vec<&str> = parts.collect();
      let (key_type, comment_parts) = match rest.split_last() {
        Some((last, init)) if last.starts_with('(') && last.ends_with(')') => {
          (last.trim_matches(|c| c == '(' || c == ')').to_string(), init)
        }
        _ => (String::new(), rest.as_slice()),
      };
      Some(SshIdentity {
        bits,
        fingerprint,
        comment: comment_parts.join(" "),
        key_type,
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_single_identity() {
    let listing = "256 SHA256:nThbg6kXUpJWGl7E1IGOCspRomTxdCARLviKw6E5SY8 alice@example.com (ED25519)\n";
    let identities = parse_identities(listing);
    assert_eq!(identities.len(), 1);
    assert_eq!(identities[0].bits, 256);
    assert_eq!(identities[0].fingerprint, "SHA256:nThbg6kXUpJWGl7E1IGOCspRomTxdCARLviKw6E5SY8");
    assert_eq!(identities[0].comment, "alice@example.com");
    assert_eq!(identities[0].key_type, "ED25519");
  }

  #[test]
  fn test_parse_comment_with_spaces() {
    let listing = "3072 SHA256:abcdef work laptop key (RSA)\n";
    let identities = parse_identities(listing);
    assert_eq!(identities[0].comment, "work laptop key");
    assert_eq!(identities[0].key_type, "RSA");
  }

  #[test]
  fn test_parse_multiple_identities() {
    let listing = "256 SHA256:one a@b (ED25519)\n3072 SHA256:two c@d (RSA)\n";
    assert_eq!(parse_identities(listing).len(), 2);
  }

  #[test]
  fn test_parse_skips_malformed_lines() {
    let listing = "The agent has no identities.\n256 SHA256:ok a@b (ED25519)\n";
    let identities = parse_identities(listing);
    assert_eq!(identities.len(), 1);
    assert_eq!(identities[0].fingerprint, "SHA256:ok");
  }

  #[test]
  fn test_parse_empty_listing() {
    assert!(parse_identities("").is_empty());
  }

  #[test]
  fn test_parse_missing_key_type() {
    let listing = "256 SHA256:bare comment-only\n";
    let identities = parse_identities(listing);
    assert_eq!(identities[0].key_type, "");
    assert_eq!(identities[0].comment, "comment-only");
  }
}
