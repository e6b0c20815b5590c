//! API gateway: fixed headers on every outbound call, HTTP and
//! JSON-parse failures normalized into a single error channel.

use std::sync::Arc;

use reqwest::{Client, Method};
use serde_json::{Value, json};
use tracing::{debug, warn};

use classfeed_types::loose;

use crate::error::ApiError;
use crate::token::TokenStore;

/// Base path and API key baked into the mobile build. Both can be
/// overridden per environment; the key travels in `x-api-key` on every
/// request.
pub const DEFAULT_BASE_URL: &str = "https://cis.kku.ac.th/api/classroom";
pub const DEFAULT_API_KEY: &str =
    "c2deee81a448e2552c5a2fa12e88cfaa9c151f514d448707ad3ebc59e04bc000";

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    api_key: String,
    http: Client,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            api_key: api_key.into(),
            http: Client::new(),
            tokens,
        }
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Issue one request with the fixed header set: API key, JSON content
    /// type, and — only when a token is stored — a bearer authorization
    /// header. Header construction never fails.
    ///
    /// A 2xx body that is not JSON degrades to `{"message": <raw text>}`
    /// instead of erroring, so callers always receive a JSON-shaped value
    /// on success. Non-2xx statuses become [`ApiError::Http`] with the
    /// message taken from the body's `message`/`error` field.
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header("x-api-key", &self.api_key)
            .header("Content-Type", "application/json");

        // A storage failure must not break header construction; the
        // request simply goes out unauthenticated.
        match self.tokens.read() {
            Ok(Some(token)) => req = req.bearer_auth(token),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "token read failed; sending unauthenticated request"),
        }

        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        debug!(%method, %url, status = status.as_u16(), "api response");

        let data: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(_) => {
                let message = if text.is_empty() {
                    "Invalid response format".to_string()
                } else {
                    text
                };
                json!({ "message": message })
            }
        };

        if !status.is_success() {
            let message = loose::first_string(&data, &["message", "error"])
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(data)
    }
}
