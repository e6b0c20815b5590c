use serde::{Deserialize, Serialize};
use serde_json::Value;

// -- Auth --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Normalized sign-in result. The server answers in one of several shapes
/// (`{data: {...}}`, `{user: {...}, token}`, or a flat record with a
/// token); the gateway collapses them into this.
#[derive(Debug, Clone)]
pub struct SignInOutcome {
    pub user: Value,
    pub token: String,
}
