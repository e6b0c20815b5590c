//! In-memory feed state: full-replace refetches with optimistic
//! like/comment overlays and exact rollback on failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use classfeed_types::loose;
use classfeed_types::models::{Comment, CommentAuthor, FeedPost};

use crate::error::ApiError;
use crate::gateway::ApiClient;
use crate::session::SessionStore;

/// Delay before the confirmatory refetch after a successful mutation,
/// giving server-side consistency a moment to settle.
const REFETCH_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct FeedStore {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    api: ApiClient,
    session: SessionStore,
    posts: RwLock<Vec<FeedPost>>,
    refetch_delay: Duration,
}

impl FeedStore {
    pub fn new(api: ApiClient, session: SessionStore) -> Self {
        Self::with_refetch_delay(api, session, REFETCH_DELAY)
    }

    /// Tests shrink the reconciliation delay through this.
    pub fn with_refetch_delay(
        api: ApiClient,
        session: SessionStore,
        refetch_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                api,
                session,
                posts: RwLock::new(Vec::new()),
                refetch_delay,
            }),
        }
    }

    /// Snapshot of the current in-memory feed.
    pub async fn posts(&self) -> Vec<FeedPost> {
        self.inner.posts.read().await.clone()
    }

    /// Fetch the full feed and replace the in-memory list wholesale.
    ///
    /// The last full fetch is always the authoritative source; optimistic
    /// state is an overlay that is superseded, never merged.
    pub async fn fetch_all(&self) -> Result<Vec<FeedPost>, ApiError> {
        let raw = self.inner.api.fetch_feed_raw().await?;
        let viewer = self.inner.session.current().identity.map(|i| i.unique_id);
        let posts: Vec<FeedPost> = raw
            .iter()
            .filter_map(|record| FeedPost::from_record(record, viewer.as_deref()))
            .collect();
        debug!(count = posts.len(), "feed replaced");
        *self.inner.posts.write().await = posts.clone();
        Ok(posts)
    }

    /// Like or unlike with an immediate optimistic flip, applied before
    /// the network call is issued. On failure the pre-call `liked_by_me`
    /// and `like_count` are restored exactly — a failed like never leaves
    /// a half-applied count.
    pub async fn toggle_like(&self, post_id: &str, currently_liked: bool) -> Result<(), ApiError> {
        if post_id.is_empty() {
            return Err(ApiError::Validation("post id is required".into()));
        }

        let prior = {
            let mut posts = self.inner.posts.write().await;
            posts.iter_mut().find(|p| p.id == post_id).map(|post| {
                let prior = (post.liked_by_me, post.like_count);
                post.liked_by_me = !currently_liked;
                post.like_count = if currently_liked {
                    post.like_count.saturating_sub(1)
                } else {
                    post.like_count + 1
                };
                post.pending_like = true;
                prior
            })
        };

        let result = if currently_liked {
            self.inner.api.unlike_post(post_id).await
        } else {
            self.inner.api.like_post(post_id).await
        };

        match result {
            Ok(_) => {
                {
                    let mut posts = self.inner.posts.write().await;
                    if let Some(post) = posts.iter_mut().find(|p| p.id == post_id) {
                        post.pending_like = false;
                    }
                }
                self.schedule_refetch();
                Ok(())
            }
            Err(e) => {
                if let Some((liked, count)) = prior {
                    let mut posts = self.inner.posts.write().await;
                    if let Some(post) = posts.iter_mut().find(|p| p.id == post_id) {
                        post.liked_by_me = liked;
                        post.like_count = count;
                        post.pending_like = false;
                    }
                }
                Err(e)
            }
        }
    }

    /// Add a comment. The local append happens only after the call
    /// succeeds, so failure has nothing to roll back.
    pub async fn add_comment(&self, post_id: &str, text: &str) -> Result<Comment, ApiError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApiError::Validation("comment text is required".into()));
        }
        if post_id.is_empty() {
            return Err(ApiError::Validation("post id is required".into()));
        }

        let response = self.inner.api.add_comment(post_id, text).await?;

        let identity = self.inner.session.current().identity;
        let comment = Comment {
            // Synthesized id when the server does not return one; the next
            // refetch supersedes it with the authoritative record.
            id: loose::first_string(&response, &["id", "_id"])
                .map(str::to_string)
                .unwrap_or_else(|| format!("local-{}", Uuid::new_v4())),
            content: text.to_string(),
            author: identity
                .as_ref()
                .map(|i| CommentAuthor {
                    id: i.unique_id.clone(),
                    display_name: i.display_name(),
                })
                .unwrap_or_default(),
            created_at: Utc::now(),
        };

        {
            let mut posts = self.inner.posts.write().await;
            if let Some(post) = posts.iter_mut().find(|p| p.id == post_id) {
                post.comments.push(comment.clone());
                post.comment_count += 1;
            }
        }

        self.schedule_refetch();
        Ok(comment)
    }

    /// Create a post, then refresh the feed immediately.
    pub async fn create_post(&self, content: &str) -> Result<(), ApiError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::Validation("post content is required".into()));
        }
        self.inner.api.create_post(content).await?;
        if let Err(e) = self.fetch_all().await {
            warn!(error = %e, "refetch after create failed");
        }
        Ok(())
    }

    /// Delete a post, then refetch unconditionally regardless of the
    /// delete outcome. Any confirmation step belongs to the caller.
    pub async fn delete_post(&self, post_id: &str) -> Result<(), ApiError> {
        let result = self.inner.api.delete_post(post_id).await.map(|_| ());
        if let Err(e) = self.fetch_all().await {
            warn!(error = %e, "refetch after delete failed");
        }
        result
    }

    /// Delete a comment, then reconcile via a deferred refetch.
    pub async fn delete_comment(&self, comment_id: &str) -> Result<(), ApiError> {
        self.inner.api.delete_comment(comment_id).await?;
        self.schedule_refetch();
        Ok(())
    }

    /// Deferred full refetch: scheduled strictly after the mutating call
    /// has resolved, never cancelled, and its authoritative result
    /// replaces any optimistic overlay.
    fn schedule_refetch(&self) {
        let store = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(store.inner.refetch_delay).await;
            if let Err(e) = store.fetch_all().await {
                warn!(error = %e, "deferred feed refetch failed");
            }
        });
    }
}
