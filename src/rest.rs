use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::error::{ConfigError, RestError};
use crate::models::channel::CreateDmChannel;
use crate::models::{Channel, CreateMessage, Message};

#[derive(Debug, Deserialize)]
struct GatewayEndpoint {
    url: String,
}

/// Authenticated calls against the service's HTTP API.
///
/// Cheap to clone; clones share the connection pool. There is no retry and
/// no rate-limit handling: a 429 comes back as `RestError::Api` like any
/// other non-success status.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    headers: HeaderMap,
}

impl RestClient {
    /// Fails when the token or client name cannot be sent as a header.
    pub fn new(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bot {}", config.token))
            .map_err(|_| ConfigError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.name)
                .map_err(|_| ConfigError::InvalidName(config.name.clone()))?,
        );

        Ok(Self {
            client: Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, RestError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{method} {path}");

        let mut builder = self.client.request(method, &url).headers(self.headers.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("failed to read {status} response body for {path}: {e}");
                    format!("<unreadable body: {e}>")
                }
            };
            return Err(RestError::Api { status, body });
        }

        Ok(resp)
    }

    async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, RestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let resp = self.send(method, path, body).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `GET /gateway`: the socket URL to connect to, without query parameters.
    pub async fn gateway_url(&self) -> Result<String, RestError> {
        let endpoint: GatewayEndpoint = self.request(Method::GET, "/gateway", None::<&()>).await?;
        Ok(endpoint.url)
    }

    pub async fn send_message(
        &self,
        channel_id: &str,
        message: &CreateMessage,
    ) -> Result<Message, RestError> {
        tracing::info!("replying to channel {channel_id}");
        self.request(
            Method::POST,
            &format!("/channels/{channel_id}/messages"),
            Some(message),
        )
        .await
    }

    pub async fn get_channel(&self, channel_id: &str) -> Result<Channel, RestError> {
        tracing::info!("getting channel with id: {channel_id}");
        self.request(Method::GET, &format!("/channels/{channel_id}"), None::<&()>)
            .await
    }

    /// Opens (or returns the existing) DM channel with a user.
    pub async fn get_dm_channel(&self, user_id: &str) -> Result<Channel, RestError> {
        tracing::info!("getting DM channel for user: {user_id}");
        let body = CreateDmChannel {
            recipient_id: user_id,
        };
        self.request(Method::POST, "/users/@me/channels", Some(&body))
            .await
    }

    pub async fn trigger_typing(&self, channel_id: &str) -> Result<(), RestError> {
        tracing::info!("triggering typing on channel {channel_id}");
        self.send(
            Method::POST,
            &format!("/channels/{channel_id}/typing"),
            None::<&()>,
        )
        .await?;
        Ok(())
    }
}
