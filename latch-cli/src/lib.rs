//! # Latch CLI Library
//!
//! Command handlers and terminal output utilities behind the `latch`
//! binary, exposed as a library so integration tests can exercise them.

pub mod cli;
pub mod output;
