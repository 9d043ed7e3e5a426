//! # Logout Command
//!
//! Removes a stored credential from every store holding it.

use anyhow::Result;
use clap::Args;
use latch_core::Platform;
use latch_core::model::normalize_host;

use crate::cli::{build_manager, fail_with_hint};
use crate::output::{format_host, print_success};

/// Command for removing a stored credential
#[derive(Args)]
pub struct LogoutArgs {
  /// Repository URL or host to forget the credential for
  pub repository: String,
}

/// Handle the logout command
pub(crate) fn handle_logout_command(args: LogoutArgs) -> Result<()> {
  let platform = Platform::detect(&args.repository);
  let host = normalize_host(&args.repository);

  let manager = build_manager()?;
  manager.delete_credential(platform, &host).map_err(fail_with_hint)?;

  print_success(&format!("removed the credential for {}", format_host(&host)));
  Ok(())
}
