use thiserror::Error;

/// Normalized failure channel for every API call.
///
/// Shape-probing exhaustion is not a separate variant: when all candidate
/// payload shapes are rejected, the error from the final attempt is
/// surfaced unchanged.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The transport itself failed; no HTTP status was received.
    #[error("network request failed: {0}")]
    Transport(String),

    /// Non-2xx response. The message comes from the body's `message` or
    /// `error` field when present.
    #[error("{message} (status {status})")]
    Http { status: u16, message: String },

    /// Empty required input, rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// A 2xx response whose shape the client could not use.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The token store could not persist or clear the credential.
    #[error("token storage failed: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
