//! Bitbucket authenticator.
//!
//! Bitbucket app passwords have no distinctive prefix, so the syntactic
//! check only rejects empty or whitespace-bearing tokens. Validation hits
//! `GET /2.0/user`; granted scopes come back in the `X-OAuth-Scopes`
//! header, the same convention GitHub uses.

use latch_core::model::normalize_host;
use latch_core::{
  AuthError, AuthMethod, AuthRequest, AuthResult, Authenticator, Credential, Platform, TwoFactorChallenge,
  TwoFactorResponse,
};
use serde::Deserialize;
use tracing::debug;

use crate::scopes::{check_scopes, parse_scope_header};
use crate::{USER_AGENT, prompt_line, prompt_secret};

const API_BASE: &str = "https://api.bitbucket.org";

#[derive(Deserialize)]
struct User {
  username: String,
}

pub struct BitbucketAuthenticator {
  api_base: String,
  client: reqwest::blocking::Client,
}

impl Default for BitbucketAuthenticator {
  fn default() -> Self {
    Self::new()
  }
}

impl BitbucketAuthenticator {
  pub fn new() -> Self {
    Self::with_api_base(API_BASE)
  }

  pub fn with_api_base(api_base: impl Into<String>) -> Self {
    Self {
      api_base: api_base.into(),
      client: reqwest::blocking::Client::new(),
    }
  }

  fn check_format(token: &str) -> Result<(), AuthError> {
    if token.is_empty() {
      return Err(AuthError::InvalidFormat("token is empty".to_string()));
    }
    if token.chars().any(char::is_whitespace) {
      return Err(AuthError::InvalidFormat("token contains whitespace".to_string()));
    }
    Ok(())
  }

  fn get_user(&self, token: &str) -> Result<reqwest::blocking::Response, AuthError> {
    self
      .client
      .get(format!("{}/2.0/user", self.api_base))
      .header("User-Agent", USER_AGENT)
      .bearer_auth(token)
      .send()
      .map_err(|e| AuthError::Network(format!("bitbucket api request failed: {e}")))
  }
}

impl Authenticator for BitbucketAuthenticator {
  fn platform(&self) -> Platform {
    Platform::Bitbucket
  }

  fn supported_methods(&self) -> Vec<AuthMethod> {
    vec![AuthMethod::Token, AuthMethod::Ssh, AuthMethod::Oauth]
  }

  fn authenticate(&self, request: &AuthRequest) -> Result<AuthResult, AuthError> {
    if !request.interactive {
      return Err(AuthError::NotAuthenticated(
        "bitbucket login requires an interactive terminal".to_string(),
      ));
    }

    let token = prompt_secret("Bitbucket app password or access token")?;
    Self::check_format(&token)?;

    let response = self.get_user(&token)?;
    if response.status() == reqwest::StatusCode::UNAUTHORIZED {
      return Err(AuthError::NotAuthenticated("bitbucket rejected the token".to_string()));
    }
    if !response.status().is_success() {
      return Err(AuthError::Network(format!(
        "bitbucket login failed with status {}",
        response.status()
      )));
    }

    let granted = response
      .headers()
      .get("X-OAuth-Scopes")
      .and_then(|value| value.to_str().ok())
      .map(parse_scope_header)
      .unwrap_or_default();
    check_scopes(&granted, &request.scopes)?;
    let user: User = response
      .json()
      .map_err(|e| AuthError::Network(format!("bitbucket returned an unexpected response: {e}")))?;
    debug!(username = %user.username, "bitbucket login verified");

    let credential = Credential::new(Platform::Bitbucket, normalize_host(&request.repository), AuthMethod::Token)
      .with_token(token)
      .with_username(user.username.clone())
      .with_scopes(granted);
    Ok(AuthResult::resolved(
      credential,
      format!("logged in to Bitbucket as {}", user.username),
    ))
  }

  fn validate_token(&self, token: &str, required_scopes: &[String]) -> Result<(), AuthError> {
    Self::check_format(token)?;

    let response = self.get_user(token)?;
    if response.status() == reqwest::StatusCode::UNAUTHORIZED {
      return Err(AuthError::NotAuthenticated("bitbucket rejected the token".to_string()));
    }
    if !response.status().is_success() {
      return Err(AuthError::Network(format!(
        "bitbucket token validation failed with status {}",
        response.status()
      )));
    }

    if let Some(header) = response.headers().get("X-OAuth-Scopes").and_then(|value| value.to_str().ok()) {
      check_scopes(&parse_scope_header(header), required_scopes)?;
    }
    Ok(())
  }

  fn refresh_token(&self, _refresh_token: &str) -> Result<Credential, AuthError> {
    Err(AuthError::ExpiredToken(
      "bitbucket app passwords cannot be refreshed; log in again".to_string(),
    ))
  }

  fn handle_two_factor(&self, challenge: &TwoFactorChallenge) -> Result<TwoFactorResponse, AuthError> {
    let code = prompt_line(&challenge.message)?;
    Ok(TwoFactorResponse {
      code,
      method: challenge.method,
    })
  }
}

#[cfg(test)]
mod tests {
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;

  fn mock_server() -> (tokio::runtime::Runtime, MockServer) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    (rt, server)
  }

  #[test]
  fn test_check_format() {
    assert!(BitbucketAuthenticator::check_format("ATBBabc123").is_ok());
    assert!(BitbucketAuthenticator::check_format("").is_err());
    assert!(BitbucketAuthenticator::check_format("has space").is_err());
  }

  #[test]
  fn test_validate_token_checks_scopes_from_header() {
    let (rt, server) = mock_server();
    rt.block_on(
      Mock::given(method("GET"))
        .and(path("/2.0/user"))
        .respond_with(
          ResponseTemplate::new(200)
            .insert_header("X-OAuth-Scopes", "repository, account")
            .set_body_json(serde_json::json!({"username": "bb-user"})),
        )
        .mount(&server),
    );

    let authenticator = BitbucketAuthenticator::with_api_base(server.uri());
    assert!(authenticator.validate_token("tok", &["account".to_string()]).is_ok());
    assert!(matches!(
      authenticator.validate_token("tok", &["pipeline".to_string()]),
      Err(AuthError::InsufficientScope { .. })
    ));
  }

  #[test]
  fn test_validate_token_maps_401_to_not_authenticated() {
    let (rt, server) = mock_server();
    rt.block_on(
      Mock::given(method("GET"))
        .and(path("/2.0/user"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server),
    );

    let authenticator = BitbucketAuthenticator::with_api_base(server.uri());
    assert!(matches!(
      authenticator.validate_token("tok", &[]),
      Err(AuthError::NotAuthenticated(_))
    ));
  }

  #[test]
  fn test_non_interactive_authenticate_fails() {
    let authenticator = BitbucketAuthenticator::new();
    let request = AuthRequest::new(Platform::Bitbucket, "bitbucket.org");
    assert!(matches!(
      authenticator.authenticate(&request),
      Err(AuthError::NotAuthenticated(_))
    ));
  }
}
