//! Client-side core for a classroom social feed.
//!
//! The server owns the data; this crate owns the reconciliation logic
//! around it: single-secret token storage, best-effort JWT payload
//! decoding, a header-injecting API gateway with one normalized error
//! channel, request-shape probing for underdocumented endpoints, session
//! state (token identity merged with the fetched profile), and an
//! in-memory feed store with optimistic like/comment mutations.

pub mod error;
pub mod feed;
pub mod gateway;
pub mod jwt;
pub mod probe;
pub mod session;
pub mod token;

mod endpoints;

pub use error::ApiError;
pub use feed::FeedStore;
pub use gateway::ApiClient;
pub use session::SessionStore;
pub use token::{FileTokenStore, MemoryTokenStore, TokenStore};
