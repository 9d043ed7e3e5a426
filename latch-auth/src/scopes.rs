//! Scope parsing and comparison shared by the platform authenticators.

use latch_core::AuthError;

/// Parse a comma-separated scope header (`X-OAuth-Scopes` style) into a
/// list, dropping empty segments.
pub(crate) fn parse_scope_header(header: &str) -> Vec<String> {
  header
    .split(',')
    .map(str::trim)
    .filter(|scope| !scope.is_empty())
    .map(str::to_string)
    .collect()
}

/// Check that every required scope was granted, failing with
/// [`AuthError::InsufficientScope`] naming the missing ones.
pub(crate) fn check_scopes(granted: &[String], required: &[String]) -> Result<(), AuthError> {
  let missing: Vec<String> = required
    .iter()
    .filter(|scope| !granted.contains(scope))
    .cloned()
    .collect();
  if missing.is_empty() {
    Ok(())
  } else {
    Err(AuthError::InsufficientScope { missing })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_scope_header() {
    assert_eq!(parse_scope_header("repo, read:user"), vec!["repo", "read:user"]);
    assert_eq!(parse_scope_header(""), Vec::<String>::new());
    assert_eq!(parse_scope_header("repo,,gist"), vec!["repo", "gist"]);
  }

  #[test]
  fn test_check_scopes_reports_missing() {
    let granted = vec!["repo".to_string()];
    let required = vec!["repo".to_string(), "admin:org".to_string()];
    let err = check_scopes(&granted, &required).unwrap_err();
    assert!(matches!(err, AuthError::InsufficientScope { ref missing } if missing == &["admin:org"]));
  }

  #[test]
  fn test_check_scopes_passes_with_superset() {
    let granted = vec!["repo".to_string(), "gist".to_string()];
    assert!(check_scopes(&granted, &["repo".to_string()]).is_ok());
    assert!(check_scopes(&granted, &[]).is_ok());
  }
}
