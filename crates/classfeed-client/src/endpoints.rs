//! Typed surface over the classroom REST API. The like/unlike/comment
//! endpoints live in [`crate::probe`] because their payload shapes have
//! to be probed.

use reqwest::Method;
use serde_json::{Value, json};
use tracing::{debug, warn};

use classfeed_types::api::{Credentials, SignInOutcome};
use classfeed_types::loose;
use classfeed_types::models::ClassMember;

use crate::error::ApiError;
use crate::gateway::ApiClient;

impl ApiClient {
    // -- Auth --

    /// POST /signin, normalize the response shape, persist the token.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<SignInOutcome, ApiError> {
        let body = json!({
            "email": credentials.email,
            "password": credentials.password,
        });
        let response = self.request(Method::POST, "/signin", Some(&body)).await?;

        // The deployed API has answered in three shapes over time:
        // {data: {...token}}, {user: {...}, token}, and flat-with-token.
        let (user, token) = if let Some(data) = response.get("data").filter(|d| d.is_object()) {
            (data.clone(), loose::first_string(data, &["token"]))
        } else if response.get("user").is_some() && response.get("token").is_some() {
            (
                response["user"].clone(),
                loose::first_string(&response, &["token"]),
            )
        } else if response.get("token").is_some() {
            (response.clone(), loose::first_string(&response, &["token"]))
        } else {
            return Err(ApiError::UnexpectedResponse(
                "invalid sign-in response format from server".into(),
            ));
        };

        let Some(token) = token.map(str::to_string) else {
            return Err(ApiError::UnexpectedResponse(
                "no token received from server".into(),
            ));
        };

        self.tokens()
            .save(&token)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        debug!("sign-in token persisted");

        Ok(SignInOutcome { user, token })
    }

    /// Best-effort server-side sign-out. Nothing suggests the deployment
    /// requires it; a failure is logged and ignored.
    pub async fn sign_out_remote(&self) {
        if let Err(e) = self.request(Method::POST, "/signout", None).await {
            warn!(error = %e, "remote sign-out failed (ignored)");
        }
    }

    // -- Profile --

    pub async fn get_profile(&self) -> Result<Value, ApiError> {
        self.request(Method::GET, "/profile", None).await
    }

    pub async fn update_profile(&self, patch: &Value) -> Result<Value, ApiError> {
        self.request(Method::PATCH, "/profile", Some(patch)).await
    }

    // -- Class roster --

    /// GET /class/{year}: classmates by enrollment year.
    pub async fn class_by_year(&self, year: &str) -> Result<Vec<ClassMember>, ApiError> {
        let year = year.trim();
        if year.is_empty() {
            return Err(ApiError::Validation("enrollment year is required".into()));
        }
        let response = self
            .request(Method::GET, &format!("/class/{year}"), None)
            .await?;
        Ok(loose::list_payload(&response)
            .iter()
            .filter_map(ClassMember::from_record)
            .collect())
    }

    // -- Status posts --

    /// GET /status: the raw feed, unwrapped from its list payload.
    pub async fn fetch_feed_raw(&self) -> Result<Vec<Value>, ApiError> {
        let response = self.request(Method::GET, "/status", None).await?;
        Ok(loose::list_payload(&response))
    }

    pub async fn get_post(&self, id: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, &format!("/status/{id}"), None)
            .await
    }

    pub async fn create_post(&self, content: &str) -> Result<Value, ApiError> {
        self.request(Method::POST, "/status", Some(&json!({ "content": content })))
            .await
    }

    pub async fn delete_post(&self, id: &str) -> Result<Value, ApiError> {
        self.request(Method::DELETE, &format!("/status/{id}"), None)
            .await
    }

    // -- Comments --

    pub async fn delete_comment(&self, id: &str) -> Result<Value, ApiError> {
        self.request(Method::DELETE, &format!("/comment/{id}"), None)
            .await
    }
}
