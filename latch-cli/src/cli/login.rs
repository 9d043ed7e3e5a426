//! # Login Command
//!
//! Resolves or creates a credential for a hosting platform and persists it.

use anyhow::Result;
use clap::Args;
use latch_core::model::normalize_host;
use latch_core::{AuthMethod, AuthRequest, Platform};

use crate::cli::{build_manager, fail_with_hint};
use crate::output::{format_host, format_username, print_info, print_success};

/// Command for authenticating against a hosting platform
#[derive(Args)]
pub struct LoginArgs {
  /// Repository URL or host to authenticate against
  #[arg(default_value = "github.com")]
  pub repository: String,

  /// Authentication method to use (token, ssh, oauth, helper)
  #[arg(short, long)]
  pub method: Option<String>,

  /// Comma-separated list of scopes the token must carry
  #[arg(short, long)]
  pub scopes: Option<String>,

  /// Skip stored credentials and force a fresh login
  #[arg(short, long)]
  pub force: bool,
}

/// Handle the login command
pub(crate) fn handle_login_command(args: LoginArgs) -> Result<()> {
  let platform = Platform::detect(&args.repository);
  let host = normalize_host(&args.repository);

  let mut request = AuthRequest::new(platform, args.repository.clone())
    .interactive(true)
    .force(args.force);
  if let Some(method) = &args.method {
    request = request.with_method(method.parse::<AuthMethod>().map_err(fail_with_hint)?);
  }
  if let Some(scopes) = &args.scopes {
    request = request.with_scopes(scopes.split(',').map(|s| s.trim().to_string()).collect());
  }

  let manager = build_manager()?;
  let result = manager.authenticate(&request).map_err(fail_with_hint)?;

  print_success(&format!("{} — {}", format_host(&host), result.message));
  if let Some(credential) = &result.credential {
    if !credential.username.is_empty() {
      print_info(&format!("authenticated as {}", format_username(&credential.username)));
    }
    if !credential.token.is_empty() {
      print_info(&format!("token: {}", credential.masked_token()));
    }
  }
  Ok(())
}
