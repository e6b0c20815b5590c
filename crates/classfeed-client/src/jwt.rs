//! Best-effort JWT payload decoding.
//!
//! The client never verifies signatures, issuers or expiry — this is a
//! purely local read used to pre-populate identity while the profile
//! fetch is pending. Any malformed input decodes to None; nothing here
//! panics or errors.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::Value;

use classfeed_types::loose;

/// Decode a token's middle segment as base64url JSON. None unless the
/// token has exactly three dot-delimited segments and a valid payload.
pub fn decode(token: &str) -> Option<Value> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }
    // Some issuers pad the segment even though JWS forbids it.
    let payload = parts[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// The identity id carried in decoded claims: first present, non-empty
/// of `id`, `_id`, `userId`.
pub fn identity_id(claims: &Value) -> Option<&str> {
    loose::first_string(claims, &["id", "_id", "userId"])
}
