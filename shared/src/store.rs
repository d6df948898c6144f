//! The repository seam between site logic and persistence.
//!
//! [`ContentStore`] lists every query and mutation the site performs. Every
//! successful mutation publishes one [`TableChange`] on the store's
//! [`ChangeFeed`]; admin views subscribe to it to know when to refetch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::models::{
    BlogPost, ContentSuggestion, DashboardStats, PostStatus, Subscriber, SubscriberStatus,
    SuggestionStatus, TableChange,
};

/// Buffered notifications per subscriber before it starts lagging.
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// Failure of a store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The addressed row does not exist.
    #[error("{entity} `{id}` not found")]
    NotFound {
        /// Entity name (`post`, `subscriber`, `suggestion`).
        entity: &'static str,
        /// Requested id.
        id: String,
    },
    /// A unique column already holds this value.
    #[error("duplicate value for unique column `{field}`")]
    Conflict {
        /// Column whose constraint was violated.
        field: &'static str,
    },
    /// Anything else the backend reported.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for posts, subscribers and content suggestions.
///
/// Listing methods return rows already ordered; `limit` caps the row count.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Published posts, newest `published_at` first.
    async fn published_posts(&self, limit: Option<usize>) -> StoreResult<Vec<BlogPost>>;

    /// The published post with this slug.
    async fn published_post_by_slug(&self, slug: &str) -> StoreResult<Option<BlogPost>>;

    /// Atomically add one view to a post and return the new count.
    async fn record_view(&self, id: &str) -> StoreResult<i64>;

    /// Published posts other than `post` sharing at least one of its tags,
    /// newest first.
    async fn related_posts(&self, post: &BlogPost, limit: usize) -> StoreResult<Vec<BlogPost>>;

    /// Every post, newest `created_at` first.
    async fn all_posts(&self) -> StoreResult<Vec<BlogPost>>;

    /// Newest posts by `created_at`.
    async fn recent_posts(&self, limit: usize) -> StoreResult<Vec<BlogPost>>;

    /// Most viewed posts.
    async fn popular_posts(&self, limit: usize) -> StoreResult<Vec<BlogPost>>;

    /// One post by id, in any status.
    async fn post(&self, id: &str) -> StoreResult<Option<BlogPost>>;

    /// Insert a new post. A taken slug is a [`StoreError::Conflict`].
    async fn insert_post(&self, post: BlogPost) -> StoreResult<BlogPost>;

    /// Overwrite the editable fields of an existing post. `views` and
    /// `created_at` are kept from the stored row.
    async fn update_post(&self, post: BlogPost) -> StoreResult<BlogPost>;

    /// Change a post's status and publication time.
    async fn set_post_status(
        &self,
        id: &str,
        status: PostStatus,
        published_at: Option<DateTime<Utc>>,
    ) -> StoreResult<BlogPost>;

    /// Replace a post's whole tag list.
    async fn replace_post_tags(&self, id: &str, tags: Vec<String>) -> StoreResult<BlogPost>;

    /// Remove a post.
    async fn delete_post(&self, id: &str) -> StoreResult<()>;

    /// Insert a subscriber. A taken email is a [`StoreError::Conflict`].
    async fn insert_subscriber(&self, subscriber: Subscriber) -> StoreResult<Subscriber>;

    /// Every subscriber, newest first.
    async fn subscribers(&self) -> StoreResult<Vec<Subscriber>>;

    /// Newest subscribers.
    async fn recent_subscribers(&self, limit: usize) -> StoreResult<Vec<Subscriber>>;

    /// Change a subscriber's status.
    async fn set_subscriber_status(
        &self,
        id: &str,
        status: SubscriberStatus,
    ) -> StoreResult<Subscriber>;

    /// Remove a subscriber.
    async fn delete_subscriber(&self, id: &str) -> StoreResult<()>;

    /// Insert a content suggestion.
    async fn insert_suggestion(
        &self,
        suggestion: ContentSuggestion,
    ) -> StoreResult<ContentSuggestion>;

    /// Every suggestion, newest first.
    async fn suggestions(&self) -> StoreResult<Vec<ContentSuggestion>>;

    /// Newest suggestions.
    async fn recent_suggestions(&self, limit: usize) -> StoreResult<Vec<ContentSuggestion>>;

    /// Change a suggestion's status.
    async fn set_suggestion_status(
        &self,
        id: &str,
        status: SuggestionStatus,
    ) -> StoreResult<ContentSuggestion>;

    /// Remove a suggestion.
    async fn delete_suggestion(&self, id: &str) -> StoreResult<()>;

    /// Row counts and total views.
    async fn dashboard_stats(&self) -> StoreResult<DashboardStats>;

    /// Subscribe to change notifications. Dropping the receiver unsubscribes.
    fn changes(&self) -> broadcast::Receiver<TableChange>;
}

/// Fan-out of [`TableChange`] notifications to any number of listeners.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<TableChange>,
}

impl ChangeFeed {
    /// Feed buffering [`CHANGE_FEED_CAPACITY`] notifications per listener.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { sender }
    }

    /// New listener; it sees only changes published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.sender.subscribe()
    }

    /// Notify current listeners. Having none is not an error.
    pub fn publish(&self, change: TableChange) {
        tracing::debug!(
            table = %change.table,
            kind = ?change.kind,
            id = %change.id,
            listeners = self.sender.receiver_count(),
            "table change"
        );
        let _ = self.sender.send(change);
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
