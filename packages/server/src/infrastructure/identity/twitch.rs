//! Twitch Helix implementation of [`IdentityProvider`].
//!
//! Uses the client-credentials flow: an app access token is requested from
//! the OAuth endpoint, then the user is looked up on `helix/users`.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{IdentityError, IdentityProvider, UserId};

pub const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const DEFAULT_USERS_URL: &str = "https://api.twitch.tv/helix/users";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    data: Vec<HelixUser>,
}

#[derive(Debug, Deserialize)]
struct HelixUser {
    display_name: String,
}

pub struct TwitchIdentityProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    users_url: String,
}

impl TwitchIdentityProvider {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_endpoints(
            client_id,
            client_secret,
            DEFAULT_TOKEN_URL.to_string(),
            DEFAULT_USERS_URL.to_string(),
        )
    }

    pub fn with_endpoints(
        client_id: String,
        client_secret: String,
        token_url: String,
        users_url: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            client_secret,
            token_url,
            users_url,
        }
    }

    async fn access_token(&self) -> Result<String, IdentityError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError::Status(response.status().as_u16()));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl IdentityProvider for TwitchIdentityProvider {
    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>, IdentityError> {
        let access_token = self.access_token().await?;

        let response = self
            .http
            .get(&self.users_url)
            .query(&[("id", user_id.as_str())])
            .header("Client-ID", &self.client_id)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdentityError::Status(response.status().as_u16()));
        }

        let users: UsersResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        Ok(users.data.into_iter().next().map(|user| user.display_name))
    }
}
