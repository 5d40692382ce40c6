//! Authentication utilities for the brokerage API

use reqwest::Client;
use tracing::{info, instrument};
use url::Url;

use super::messages::TokenResponse;
use crate::common::errors::{ClientError, Result};

/// Bearer token attached to every authenticated request
#[derive(Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Add the authorization header to a reqwest RequestBuilder
    pub fn apply_to_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.bearer_auth(&self.0)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

/// Exchange a username and password for an access token
///
/// # Arguments
/// * `base_url` - API root, already normalized with a trailing slash
/// * `client_id` - OAuth client identifier
#[instrument(skip(client, password))]
pub async fn password_grant(
    client: &Client,
    base_url: &Url,
    client_id: &str,
    username: &str,
    password: &str,
) -> Result<BearerToken> {
    let url = base_url.join("oauth2/token/")?;
    let form = [
        ("grant_type", "password"),
        ("scope", "internal"),
        ("expires_in", "86400"),
        ("client_id", client_id),
        ("username", username),
        ("password", password),
    ];

    let response = client.post(url).form(&form).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Authentication(format!(
            "login returned status {}: {}",
            status, body
        )));
    }

    let token: TokenResponse = response.json().await?;
    if token.access_token.is_empty() {
        return Err(ClientError::Authentication(
            "login returned an empty access token".to_string(),
        ));
    }

    info!(expires_in = ?token.expires_in, "Authenticated with brokerage");
    Ok(BearerToken::new(token.access_token))
}
