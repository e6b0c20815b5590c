//! Request-shape probing for endpoints whose accepted payload field
//! names could not be pinned down from the upstream documentation.
//!
//! Candidate shapes are tried in a fixed order; the first accepted one
//! wins, and exhaustion surfaces the error from the final attempt. This
//! is a compatibility workaround for an underspecified contract, not a
//! transient-failure retry: the loop is bounded by the candidate list
//! and callers only ever see success or the single last failure.

use reqwest::Method;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::gateway::ApiClient;

/// Post-id key spellings observed to vary across deployments.
pub const POST_ID_KEYS: [&str; 4] = ["statusId", "status_id", "postId", "id"];

/// Endpoint variants for removing a like.
pub const UNLIKE_PATHS: [&str; 2] = ["/unlike", "/like"];

/// Comment content-key spellings.
pub const COMMENT_CONTENT_KEYS: [&str; 3] = ["content", "text", "message"];

/// Comment post-id key spellings (adds `post_id`).
pub const COMMENT_ID_KEYS: [&str; 4] = ["statusId", "status_id", "postId", "post_id"];

impl ApiClient {
    /// POST /like, probing the four post-id shapes in order.
    pub async fn like_post(&self, post_id: &str) -> Result<Value, ApiError> {
        if post_id.is_empty() {
            return Err(ApiError::Validation(
                "post id is required for like operation".into(),
            ));
        }
        let attempts = POST_ID_KEYS
            .iter()
            .map(|key| (Method::POST, "/like".to_string(), id_body(key, post_id)))
            .collect();
        self.probe("like", attempts).await
    }

    /// DELETE /unlike then DELETE /like, each probing the four post-id
    /// shapes — eight combinations before giving up.
    pub async fn unlike_post(&self, post_id: &str) -> Result<Value, ApiError> {
        if post_id.is_empty() {
            return Err(ApiError::Validation(
                "post id is required for unlike operation".into(),
            ));
        }
        let mut attempts = Vec::with_capacity(UNLIKE_PATHS.len() * POST_ID_KEYS.len());
        for path in UNLIKE_PATHS {
            for key in POST_ID_KEYS {
                attempts.push((Method::DELETE, path.to_string(), id_body(key, post_id)));
            }
        }
        self.probe("unlike", attempts).await
    }

    /// POST /comment, probing content-key x id-key shapes (content-key
    /// major) — twelve combinations.
    pub async fn add_comment(&self, post_id: &str, content: &str) -> Result<Value, ApiError> {
        if post_id.is_empty() {
            return Err(ApiError::Validation(
                "post id is required for comment operation".into(),
            ));
        }
        if content.is_empty() {
            return Err(ApiError::Validation("comment content is required".into()));
        }
        let mut attempts =
            Vec::with_capacity(COMMENT_CONTENT_KEYS.len() * COMMENT_ID_KEYS.len());
        for content_key in COMMENT_CONTENT_KEYS {
            for id_key in COMMENT_ID_KEYS {
                let mut body = Map::new();
                body.insert(id_key.to_string(), Value::String(post_id.to_string()));
                body.insert(content_key.to_string(), Value::String(content.to_string()));
                attempts.push((Method::POST, "/comment".to_string(), Value::Object(body)));
            }
        }
        self.probe("comment", attempts).await
    }

    /// Try each candidate in order; return the first success, or the
    /// error from the final attempt once the list is exhausted.
    async fn probe(
        &self,
        op: &str,
        attempts: Vec<(Method, String, Value)>,
    ) -> Result<Value, ApiError> {
        let total = attempts.len();
        let mut last = ApiError::Validation(format!("{op}: no candidate shapes to try"));
        for (i, (method, path, body)) in attempts.into_iter().enumerate() {
            match self.request(method, &path, Some(&body)).await {
                Ok(value) => {
                    debug!(op, attempt = i + 1, total, "payload shape accepted");
                    return Ok(value);
                }
                Err(e) => {
                    debug!(op, attempt = i + 1, total, error = %e, "payload shape rejected");
                    last = e;
                }
            }
        }
        warn!(op, total, "every candidate payload shape was rejected");
        Err(last)
    }
}

fn id_body(key: &str, post_id: &str) -> Value {
    let mut body = Map::new();
    body.insert(key.to_string(), Value::String(post_id.to_string()));
    Value::Object(body)
}
