//! Environment variable management for testing
//!
//! This module provides utilities for setting and unsetting environment
//! variables during testing while guaranteeing the original values are
//! restored, so tests don't interfere with each other.
//!
//! Tests touching the same variable must not run concurrently; use a single
//! test per variable or serialize them explicitly.

use std::env;

/// Overrides one environment variable for the lifetime of the guard and
/// restores the original value on drop.
pub struct EnvVarGuard {
  key: String,
  /// The original value, if any
  original: Option<String>,
}

impl EnvVarGuard {
  /// Set `key` to `value` until the guard is dropped.
  pub fn set(key: impl Into<String>, value: &str) -> Self {
    let key = key.into();
    let original = env::var(&key).ok();
    unsafe {
      env::set_var(&key, value);
    }
    Self { key, original }
  }

  /// Unset `key` until the guard is dropped.
  pub fn unset(key: impl Into<String>) -> Self {
    let key = key.into();
    let original = env::var(&key).ok();
    unsafe {
      env::remove_var(&key);
    }
    Self { key, original }
  }
}

impl Drop for EnvVarGuard {
  fn drop(&mut self) {
    match &self.original {
      Some(val) => unsafe {
        env::set_var(&self.key, val);
      },
      None => unsafe {
        env::remove_var(&self.key);
      },
    }
  }
}
