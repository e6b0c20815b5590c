//! Session reconciliation.
//!
//! On startup and after sign-in, token-derived identity and the freshly
//! fetched server profile are merged into one canonical record. State is
//! published through a watch channel so view code subscribes to updates
//! instead of reaching into ambient globals.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use classfeed_types::api::Credentials;
use classfeed_types::models::{Session, UserIdentity};

use crate::gateway::ApiClient;
use crate::jwt;

#[derive(Clone)]
pub struct SessionStore {
    api: ApiClient,
    state: Arc<watch::Sender<Session>>,
}

impl SessionStore {
    pub fn new(api: ApiClient) -> Self {
        let (tx, _rx) = watch::channel(Session::initial());
        Self {
            api,
            state: Arc::new(tx),
        }
    }

    /// Snapshot of the current session state.
    pub fn current(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Subscribe to session updates.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    fn update(&self, f: impl FnOnce(&mut Session)) {
        self.state.send_modify(f);
    }

    /// Runs once at process start: resolve the stored token into either an
    /// authenticated identity or a clean signed-out state. The loading
    /// flag is cleared on every exit path.
    pub async fn bootstrap(&self) {
        self.update(|s| s.is_loading = true);
        let identity = self.resolve_startup_identity().await;
        self.update(|s| {
            s.is_authenticated = identity.is_some();
            s.identity = identity;
            s.is_loading = false;
        });
    }

    async fn resolve_startup_identity(&self) -> Option<UserIdentity> {
        let token = match self.api.tokens().read() {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("no stored token; starting signed out");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "token read failed; discarding any stored token");
                self.discard_token();
                return None;
            }
        };

        // Best-effort local decode: pre-populates identity while the
        // profile fetch is pending and backs the offline fallback.
        let claims = jwt::decode(&token);
        if claims.is_none() {
            warn!("stored token payload is not decodable");
        }

        match self.api.get_profile().await {
            Ok(profile) => {
                let merged = UserIdentity::merged(claims.as_ref(), &profile);
                if merged.is_none() {
                    warn!("neither profile nor token carries a usable id; discarding token");
                    self.discard_token();
                }
                merged
            }
            Err(e) => {
                warn!(error = %e, "profile fetch failed during bootstrap");
                match claims.as_ref().and_then(UserIdentity::from_claims) {
                    Some(identity) => {
                        debug!(user = %identity.unique_id, "falling back to token-derived identity");
                        Some(identity)
                    }
                    None => {
                        // Unreachable profile and an undecodable token:
                        // treat the token as invalid.
                        self.discard_token();
                        None
                    }
                }
            }
        }
    }

    /// Remote sign-in. The outcome is published through the session
    /// state: success authenticates, any failure lands in `last_error`
    /// and leaves the session signed out. Loading is cleared either way.
    ///
    /// Empty-credential checks belong to the caller.
    pub async fn sign_in(&self, credentials: &Credentials) {
        self.update(|s| {
            s.is_loading = true;
            s.last_error = None;
        });

        let outcome = match self.api.sign_in(credentials).await {
            Ok(outcome) => match UserIdentity::from_record(&outcome.user) {
                Some(identity) => {
                    debug!(user = %identity.unique_id, "signed in");
                    Ok(identity)
                }
                None => Err("no user data received from server".to_string()),
            },
            Err(e) => Err(e.to_string()),
        };

        self.update(|s| {
            match outcome {
                Ok(identity) => {
                    s.identity = Some(identity);
                    s.is_authenticated = true;
                }
                Err(message) => s.last_error = Some(message),
            }
            s.is_loading = false;
        });
    }

    /// Best-effort remote sign-out, then an unconditional local reset.
    pub async fn sign_out(&self) {
        self.update(|s| s.is_loading = true);
        self.api.sign_out_remote().await;
        self.discard_token();
        self.update(|s| {
            s.identity = None;
            s.is_authenticated = false;
            s.last_error = None;
            s.is_loading = false;
        });
    }

    /// Drop the error payload without touching authentication state.
    pub fn clear_error(&self) {
        self.update(|s| s.last_error = None);
    }

    fn discard_token(&self) {
        if let Err(e) = self.api.tokens().clear() {
            warn!(error = %e, "failed to clear stored token");
        }
    }
}
