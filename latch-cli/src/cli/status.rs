//! # Status Command
//!
//! Reports whether stored credentials are still usable: unexpired and,
//! where the platform API supports it, accepted by the platform.

use anyhow::Result;
use clap::Args;
use latch_core::model::normalize_host;
use latch_core::{AuthError, Credential, Manager, Platform};

use crate::cli::{build_manager, fail_with_hint};
use crate::output::{format_host, format_timestamp, format_validity, print_info, print_warning};

/// Command for checking credential health
#[derive(Args)]
pub struct StatusArgs {
  /// Limit the check to one repository URL or host
  pub repository: Option<String>,
}

/// Handle the status command
pub(crate) fn handle_status_command(args: StatusArgs) -> Result<()> {
  let manager = build_manager()?;

  let credentials = match &args.repository {
    Some(repository) => {
      let platform = Platform::detect(repository);
      let host = normalize_host(repository);
      vec![manager.get_credential(platform, &host).map_err(fail_with_hint)?]
    }
    None => manager.list_credentials().map_err(fail_with_hint)?,
  };

  if credentials.is_empty() {
    print_warning("no stored credentials");
    return Ok(());
  }

  for credential in &credentials {
    report_credential(&manager, credential);
  }
  Ok(())
}

fn report_credential(manager: &Manager, credential: &Credential) {
  let state = match manager.validate_credential(credential) {
    Ok(()) => "valid".to_string(),
    Err(AuthError::ExpiredToken(_)) => "expired".to_string(),
    Err(AuthError::Network(e)) => format!("unverified ({e})"),
    Err(_) => "invalid".to_string(),
  };

  let mut line = format!(
    "{} [{}] {} — {}",
    format_host(&credential.id),
    credential.platform,
    credential.method,
    format_validity(&state)
  );
  if let Some(expires_at) = credential.expires_at {
    line.push_str(&format!(" (expires {})", format_timestamp(&expires_at.to_rfc3339())));
  }
  print_info(&line);
}
