//! # Latch Test Utilities
//!
//! Shared helpers for tests across the latch workspace.

pub mod env;

pub use env::EnvVarGuard;
