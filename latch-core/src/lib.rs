//! # Latch Core Library
//!
//! The credential subsystem behind the latch tool: the credential model, the
//! shared error taxonomy, durable storage backends (OS keychain, encrypted
//! file), read-only credential helpers bridging to external tooling, the SSH
//! agent binding, and the [`Manager`] that decides which credential to use for
//! a given platform/repository pair.
//!
//! Platform-specific login handshakes live in the `latch-auth` crate; this
//! crate only defines the [`Authenticator`] capability they implement.

pub mod auth;
pub mod error;
pub mod helper;
pub mod manager;
pub mod model;
pub mod ssh;
pub mod store;

// Re-export the main types so consumers can depend on `latch_core::Manager`
// without spelling out the module tree.
pub use auth::Authenticator;
pub use error::AuthError;
pub use helper::CredentialHelper;
pub use manager::Manager;
pub use model::{
  AuthMethod, AuthRequest, AuthResult, Credential, Platform, TwoFactorChallenge, TwoFactorMethod, TwoFactorResponse,
};
pub use ssh::{SshAgent, SshIdentity};
pub use store::CredentialStore;
