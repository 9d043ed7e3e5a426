//! # List Command
//!
//! Lists stored credentials. Tokens are always masked; the raw secret is
//! only reachable through `latch token`.

use anyhow::Result;
use clap::{Args, ValueEnum};
use latch_core::Credential;
use tabled::{Table, Tabled};

use crate::cli::{build_manager, fail_with_hint};
use crate::output::print_warning;

/// Output format for the list command
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
  /// Human-readable table
  Table,
  /// Machine-readable JSON (tokens stay masked)
  Json,
}

/// Command for listing stored credentials
#[derive(Args)]
pub struct ListArgs {
  /// Output format
  #[arg(long, value_enum, ignore_case = true, default_value_t = ListFormat::Table)]
  pub format: ListFormat,
}

/// Handle the list command
pub(crate) fn handle_list_command(args: ListArgs) -> Result<()> {
  let manager = build_manager()?;
  let credentials = manager.list_credentials().map_err(fail_with_hint)?;

  if credentials.is_empty() {
    print_warning("no stored credentials");
    return Ok(());
  }

  match args.format {
    ListFormat::Table => print_table(&credentials),
    ListFormat::Json => print_json(&credentials)?,
  }
  Ok(())
}

fn print_table(credentials: &[Credential]) {
  #[derive(Tabled)]
  struct CredentialRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Platform")]
    platform: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Updated")]
    updated: String,
    #[tabled(rename = "Expires")]
    expires: String,
  }

  let rows: Vec<CredentialRow> = credentials
    .iter()
    .map(|credential| CredentialRow {
      host: credential.id.clone(),
      platform: credential.platform.to_string(),
      method: credential.method.to_string(),
      username: credential.username.clone(),
      token: credential.masked_token(),
      updated: credential.updated_at.format("%Y-%m-%d").to_string(),
      expires: credential
        .expires_at
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "never".to_string()),
    })
    .collect();

  println!("{}", Table::new(rows));
}

fn print_json(credentials: &[Credential]) -> Result<()> {
  // Hand-built JSON rather than serializing Credential directly: the wire
  // form of Credential carries the raw token, and list output must not.
  let entries: Vec<serde_json::Value> = credentials
    .iter()
    .map(|credential| {
      serde_json::json!({
        "id": credential.id,
        "platform": credential.platform,
        "method": credential.method,
        "username": credential.username,
        "token": credential.masked_token(),
        "scopes": credential.scopes,
        "created_at": credential.created_at,
        "updated_at": credential.updated_at,
        "expires_at": credential.expires_at,
      })
    })
    .collect();
  println!("{}", serde_json::to_string_pretty(&entries)?);
  Ok(())
}
