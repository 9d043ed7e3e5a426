//! # Token Command
//!
//! Registers a manually supplied token: the token is validated against the
//! platform before anything is written, so a typo never lands in a store.

use anyhow::Result;
use clap::Args;
use latch_core::model::normalize_host;
use latch_core::{AuthMethod, Credential, Platform};

use crate::cli::{build_manager, fail_with_hint};
use crate::output::{format_host, print_success};

/// Command for registering a token directly
#[derive(Args)]
pub struct TokenArgs {
  /// Repository URL or host the token is for
  pub repository: String,

  /// The token to register
  pub token: String,

  /// Comma-separated list of scopes the token must carry
  #[arg(short, long)]
  pub scopes: Option<String>,
}

/// Handle the token command
pub(crate) fn handle_token_command(args: TokenArgs) -> Result<()> {
  let platform = Platform::detect(&args.repository);
  let host = normalize_host(&args.repository);
  let scopes: Vec<String> = args
    .scopes
    .as_deref()
    .map(|scopes| scopes.split(',').map(|s| s.trim().to_string()).collect())
    .unwrap_or_default();

  // Validate before anything touches a store.
  let authenticator = latch_auth::authenticator_for(platform);
  authenticator.validate_token(&args.token, &scopes).map_err(fail_with_hint)?;

  let credential = Credential::new(platform, host.clone(), AuthMethod::Token)
    .with_token(args.token)
    .with_scopes(scopes);

  let manager = build_manager()?;
  manager.store_credential(&credential).map_err(fail_with_hint)?;

  print_success(&format!(
    "stored the token for {} ({})",
    format_host(&host),
    credential.masked_token()
  ));
  Ok(())
}
