//! Credential resolution and orchestration.
//!
//! [`Manager`] owns the registered authenticators, stores, helpers, and the
//! SSH agent binding, and resolves every authentication request through the
//! same fixed order: stored credentials first, then external helpers, then
//! the SSH agent (when the ssh method was asked for), and only then an
//! interactive platform login. Registration order is priority order; the
//! manager never reorders backends behind the caller's back.
//!
//! Managers are plain values wired up by the caller. Construct one, register
//! what the process needs, and pass it down; nothing here is global.

use tracing::{debug, info, warn};

use crate::auth::Authenticator;
use crate::error::AuthError;
use crate::helper::CredentialHelper;
use crate::model::{AuthMethod, AuthRequest, AuthResult, Credential, Platform, normalize_host};
use crate::ssh::SshAgent;
use crate::store::CredentialStore;

/// Orchestrates credential resolution across every registered source.
#[derive(Default)]
pub struct Manager {
  authenticators: Vec<Box<dyn Authenticator>>,
  stores: Vec<Box<dyn CredentialStore>>,
  helpers: Vec<Box<dyn CredentialHelper>>,
  ssh_agent: Option<Box<dyn SshAgent>>,
}

impl Manager {
  /// An empty manager with no backends. Callers register what they need.
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a platform authenticator. The first authenticator registered
  /// for a platform wins; later ones for the same platform are ignored at
  /// lookup time.
  pub fn register_authenticator(&mut self, authenticator: Box<dyn Authenticator>) {
    debug!(platform = %authenticator.platform(), "authenticator registered");
    self.authenticators.push(authenticator);
  }

  /// Register a credential store. Stores are consulted in registration
  /// order for reads and writes.
  pub fn register_store(&mut self, store: Box<dyn CredentialStore>) {
    debug!(store = store.name(), "credential store registered");
    self.stores.push(store);
  }

  /// Register a read-only credential helper. Helpers are consulted in
  /// registration order after the stores.
  pub fn register_helper(&mut self, helper: Box<dyn CredentialHelper>) {
    debug!(helper = helper.name(), "credential helper registered");
    self.helpers.push(helper);
  }

  /// Attach an SSH agent binding, used when a request asks for the ssh
  /// method.
  pub fn set_ssh_agent(&mut self, agent: Box<dyn SshAgent>) {
    self.ssh_agent = Some(agent);
  }

  fn authenticator_for(&self, platform: Platform) -> Option<&dyn Authenticator> {
    self
      .authenticators
      .iter()
      .find(|authenticator| authenticator.platform() == platform)
      .map(|boxed| boxed.as_ref())
  }

  /// Resolve a credential for `request`.
  ///
  /// Sources are tried in a fixed order: stored credentials (skipped when
  /// `request.force` is set), helpers, the SSH agent for ssh-method
  /// requests, and finally the platform authenticator. An agent that is
  /// absent or holds no identities falls through to the authenticator like
  /// any other unresolved source. The authenticator is only reached when
  /// `request.interactive` allows prompting; otherwise exhaustion of the
  /// non-interactive sources fails with [`AuthError::NotAuthenticated`].
  ///
  /// Credentials minted by the authenticator are persisted to the first
  /// store that accepts them. Helper and SSH results are never persisted:
  /// their source of truth stays with the external tool or agent.
  pub fn authenticate(&self, request: &AuthRequest) -> Result<AuthResult, AuthError> {
    let host = normalize_host(&request.repository);
    debug!(platform = %request.platform, %host, force = request.force, "resolving credential");

    if !request.force {
      if let Some(result) = self.resolve_from_stores(request.platform, &host) {
        return Ok(result);
      }
      if let Some(result) = self.resolve_from_helpers(request) {
        return Ok(result);
      }
    }

    if request.method == Some(AuthMethod::Ssh) {
      match self.resolve_from_ssh_agent(request.platform, &host) {
        Ok(result) => return Ok(result),
        Err(e) => debug!("ssh agent did not resolve: {e}; continuing to the platform login"),
      }
    }

    if !request.interactive {
      return Err(AuthError::NotAuthenticated(format!(
        "no stored credential for {}/{host} and interactive login is disabled",
        request.platform
      )));
    }

    let authenticator = self.authenticator_for(request.platform).ok_or_else(|| {
      AuthError::NotAuthenticated(format!("no authenticator registered for {}", request.platform))
    })?;
    let result = authenticator.authenticate(request)?;

    if let Some(credential) = &result.credential {
      // A persistence failure downgrades to a warning: the user did log in
      // and holds a working token for this process.
      if let Err(e) = self.store_credential(credential) {
        warn!("credential obtained but could not be persisted: {e}");
      }
    }
    info!(platform = %request.platform, %host, method = %result.method, "authentication succeeded");
    Ok(result)
  }

  fn resolve_from_stores(&self, platform: Platform, host: &str) -> Option<AuthResult> {
    for store in &self.stores {
      if !store.is_available() {
        continue;
      }
      match store.get(platform, host) {
        Ok(credential) => {
          if credential.is_expired() {
            debug!(store = store.name(), "stored credential has expired; trying next source");
            continue;
          }
          if let Err(e) = credential.validate() {
            warn!(store = store.name(), "stored credential is malformed: {e}");
            continue;
          }
          debug!(store = store.name(), "resolved from store");
          let message = format!("using stored credential from the {} store", store.name());
          return Some(AuthResult::resolved(credential, message));
        }
        Err(AuthError::NotFound { .. }) => {}
        Err(e) => warn!(store = store.name(), "store lookup failed: {e}"),
      }
    }
    None
  }

  fn resolve_from_helpers(&self, request: &AuthRequest) -> Option<AuthResult> {
    for helper in &self.helpers {
      if !helper.is_available() {
        continue;
      }
      match helper.get_credential(request.platform, &request.repository) {
        Ok(credential) => {
          // Helpers hand back opaque tokens; reject ones the platform says
          // are unusable rather than passing a dud downstream.
          if let Some(authenticator) = self.authenticator_for(request.platform) {
            if let Err(e) = authenticator.validate_token(&credential.token, &request.scopes) {
              warn!(helper = helper.name(), "helper credential rejected: {e}");
              continue;
            }
          }
          debug!(helper = helper.name(), "resolved from helper");
          let message = format!("using credential from the {} helper", helper.name());
          return Some(AuthResult::resolved(credential, message));
        }
        Err(e) => debug!(helper = helper.name(), "helper could not resolve: {e}"),
      }
    }
    None
  }

  fn resolve_from_ssh_agent(&self, platform: Platform, host: &str) -> Result<AuthResult, AuthError> {
    let agent = self
      .ssh_agent
      .as_ref()
      .ok_or_else(|| AuthError::NotAuthenticated("no SSH agent binding is configured".to_string()))?;
    if !agent.is_available() {
      return Err(AuthError::NotAuthenticated("no SSH agent is running".to_string()));
    }
    if !agent.has_identity_for(host)? {
      return Err(AuthError::NotAuthenticated(
        "the SSH agent is running but holds no identities".to_string(),
      ));
    }
    // Marker credential only: the agent keeps the keys, ssh does the
    // handshake at fetch/push time, and nothing is persisted.
    let credential = Credential::new(platform, host, AuthMethod::Ssh);
    Ok(AuthResult::resolved(credential, "using an identity from the SSH agent"))
  }

  /// Persist a credential to the first store that accepts it.
  ///
  /// Unavailable stores are skipped and write failures fall through to the
  /// next store; only exhaustion of every store fails with
  /// [`AuthError::StorageUnavailable`].
  pub fn store_credential(&self, credential: &Credential) -> Result<(), AuthError> {
    credential.validate()?;
    let mut to_store = credential.clone();
    to_store.touch();

    for store in &self.stores {
      if !store.is_available() {
        debug!(store = store.name(), "store unavailable; trying next");
        continue;
      }
      match store.set(&to_store) {
        Ok(()) => {
          info!(store = store.name(), credential = %to_store, "credential stored");
          return Ok(());
        }
        Err(e) => warn!(store = store.name(), "store rejected the write: {e}"),
      }
    }
    Err(AuthError::StorageUnavailable(
      "no registered credential store accepted the write".to_string(),
    ))
  }

  /// Fetch the stored credential for `(platform, id)` from the first store
  /// holding one. Expiry is not checked here; `status`-style callers want
  /// to see expired entries too.
  pub fn get_credential(&self, platform: Platform, id: &str) -> Result<Credential, AuthError> {
    for store in &self.stores {
      if !store.is_available() {
        continue;
      }
      match store.get(platform, id) {
        Ok(credential) => return Ok(credential),
        Err(AuthError::NotFound { .. }) => {}
        Err(e) => warn!(store = store.name(), "store lookup failed: {e}"),
      }
    }
    Err(AuthError::NotFound {
      platform,
      id: id.to_string(),
    })
  }

  /// All stored credentials across every available store, deduplicated by
  /// `(platform, id)` with the most recently updated entry winning, sorted
  /// for stable output.
  pub fn list_credentials(&self) -> Result<Vec<Credential>, AuthError> {
    let mut merged: Vec<Credential> = Vec::new();
    for store in &self.stores {
      if !store.is_available() {
        continue;
      }
      let listed = match store.list() {
        Ok(listed) => listed,
        Err(e) => {
          warn!(store = store.name(), "store listing failed: {e}");
          continue;
        }
      };
      for credential in listed {
        match merged
          .iter_mut()
          .find(|existing| existing.platform == credential.platform && existing.id == credential.id)
        {
          Some(existing) => {
            if credential.updated_at > existing.updated_at {
              *existing = credential;
            }
          }
          None => merged.push(credential),
        }
      }
    }
    merged.sort_by(|a, b| (a.platform, &a.id).cmp(&(b.platform, &b.id)));
    Ok(merged)
  }

  /// Delete `(platform, id)` from every store holding it. Succeeds when at
  /// least one store deleted an entry.
  pub fn delete_credential(&self, platform: Platform, id: &str) -> Result<(), AuthError> {
    let mut deleted = false;
    for store in &self.stores {
      if !store.is_available() {
        continue;
      }
      match store.delete(platform, id) {
        Ok(()) => {
          info!(store = store.name(), "credential deleted");
          deleted = true;
        }
        Err(AuthError::NotFound { .. }) => {}
        Err(e) => warn!(store = store.name(), "store delete failed: {e}"),
      }
    }
    if deleted {
      Ok(())
    } else {
      Err(AuthError::NotFound {
        platform,
        id: id.to_string(),
      })
    }
  }

  /// Fetch the stored credential for `(platform, id)` and check it is still
  /// usable. Presence and validity are distinct: `get_credential` returns
  /// expired entries, this fails on them.
  pub fn validate_credentials(&self, platform: Platform, id: &str) -> Result<(), AuthError> {
    let credential = self.get_credential(platform, id)?;
    self.validate_credential(&credential)
  }

  /// Check that a credential is still usable: unexpired, well-formed, and
  /// (for secret-bearing methods) accepted by the platform.
  pub fn validate_credential(&self, credential: &Credential) -> Result<(), AuthError> {
    if credential.is_expired() {
      return Err(AuthError::ExpiredToken(format!(
        "credential for {}/{} expired at {}",
        credential.platform,
        credential.id,
        credential.expires_at.map(|t| t.to_rfc3339()).unwrap_or_default()
      )));
    }
    credential.validate()?;

    if credential.method == AuthMethod::Ssh {
      return Ok(());
    }
    if let Some(authenticator) = self.authenticator_for(credential.platform) {
      authenticator.validate_token(&credential.token, &credential.scopes)?;
    }
    Ok(())
  }

  /// Replace an expired or expiring credential.
  ///
  /// Tries the platform's refresh exchange first; when the platform has
  /// none, falls back to a fresh interactive login if `interactive` allows
  /// it. The replacement is persisted before being returned.
  pub fn refresh_credential(&self, credential: &Credential, interactive: bool) -> Result<Credential, AuthError> {
    let authenticator = self.authenticator_for(credential.platform).ok_or_else(|| {
      AuthError::NotAuthenticated(format!("no authenticator registered for {}", credential.platform))
    })?;

    match authenticator.refresh_token(&credential.token) {
      Ok(refreshed) => {
        self.store_credential(&refreshed)?;
        info!(credential = %refreshed, "credential refreshed");
        Ok(refreshed)
      }
      Err(refresh_err) => {
        if !interactive {
          return Err(refresh_err);
        }
        debug!("refresh failed ({refresh_err}); falling back to interactive login");
        let request = AuthRequest::new(credential.platform, credential.id.clone())
          .with_method(credential.method)
          .with_scopes(credential.scopes.clone())
          .interactive(true)
          .force(true);
        let result = self.authenticate(&request)?;
        result.credential.ok_or_else(|| {
          AuthError::NotAuthenticated("interactive login completed without producing a credential".to_string())
        })
      }
    }
  }
}
