//! Process-local [`ContentStore`] kept in vectors behind a lock.
//!
//! Used for tests and for running the backend without a database file.
//! Enforces the same unique columns as the SQLite store.

use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};

use crate::{
    models::{
        BlogPost, ChangeKind, ContentSuggestion, DashboardStats, PostStatus, Subscriber,
        SubscriberStatus, SuggestionStatus, Table, TableChange,
    },
    store::{ChangeFeed, ContentStore, StoreError, StoreResult},
};

#[derive(Debug, Default)]
struct Tables {
    posts: Vec<BlogPost>,
    subscribers: Vec<Subscriber>,
    suggestions: Vec<ContentSuggestion>,
}

/// In-memory content store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    feed: ChangeFeed,
}

impl MemoryStore {
    /// Empty store with its own change feed.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Rows sorted by `key` descending; among equal keys the later insert wins.
fn newest_first<'a, T, K, F>(rows: impl DoubleEndedIterator<Item = &'a T>, key: F) -> Vec<T>
where
    T: Clone + 'a,
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut sorted: Vec<T> = rows.rev().cloned().collect();
    sorted.sort_by_key(|row| Reverse(key(row)));
    sorted
}

fn take(mut rows: Vec<BlogPost>, limit: Option<usize>) -> Vec<BlogPost> {
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

fn find_post<'a>(posts: &'a mut [BlogPost], id: &str) -> StoreResult<&'a mut BlogPost> {
    posts
        .iter_mut()
        .find(|post| post.id == id)
        .ok_or_else(|| StoreError::not_found("post", id))
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn published_posts(&self, limit: Option<usize>) -> StoreResult<Vec<BlogPost>> {
        let tables = self.tables.read().await;
        let rows = newest_first(
            tables.posts.iter().filter(|post| post.is_published()),
            |post| post.published_at,
        );
        Ok(take(rows, limit))
    }

    async fn published_post_by_slug(&self, slug: &str) -> StoreResult<Option<BlogPost>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|post| post.slug == slug && post.is_published())
            .cloned())
    }

    async fn record_view(&self, id: &str) -> StoreResult<i64> {
        let views = {
            let mut tables = self.tables.write().await;
            let post = find_post(&mut tables.posts, id)?;
            post.views += 1;
            post.views
        };
        self.feed
            .publish(TableChange::new(Table::BlogPosts, ChangeKind::Update, id));
        Ok(views)
    }

    async fn related_posts(&self, post: &BlogPost, limit: usize) -> StoreResult<Vec<BlogPost>> {
        let tables = self.tables.read().await;
        let rows = newest_first(
            tables.posts.iter().filter(|candidate| {
                candidate.is_published() && candidate.id != post.id && candidate.shares_tag_with(post)
            }),
            |candidate| candidate.published_at,
        );
        Ok(take(rows, Some(limit)))
    }

    async fn all_posts(&self) -> StoreResult<Vec<BlogPost>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.posts.iter(), |post| post.created_at))
    }

    async fn recent_posts(&self, limit: usize) -> StoreResult<Vec<BlogPost>> {
        Ok(take(self.all_posts().await?, Some(limit)))
    }

    async fn popular_posts(&self, limit: usize) -> StoreResult<Vec<BlogPost>> {
        let tables = self.tables.read().await;
        let rows = newest_first(tables.posts.iter(), |post| (post.views, post.created_at));
        Ok(take(rows, Some(limit)))
    }

    async fn post(&self, id: &str) -> StoreResult<Option<BlogPost>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn insert_post(&self, post: BlogPost) -> StoreResult<BlogPost> {
        {
            let mut tables = self.tables.write().await;
            if tables.posts.iter().any(|existing| existing.slug == post.slug) {
                return Err(StoreError::Conflict { field: "slug" });
            }
            tables.posts.push(post.clone());
        }
        self.feed
            .publish(TableChange::new(Table::BlogPosts, ChangeKind::Insert, &post.id));
        Ok(post)
    }

    async fn update_post(&self, post: BlogPost) -> StoreResult<BlogPost> {
        let updated = {
            let mut tables = self.tables.write().await;
            if tables
                .posts
                .iter()
                .any(|existing| existing.slug == post.slug && existing.id != post.id)
            {
                return Err(StoreError::Conflict { field: "slug" });
            }
            let stored = find_post(&mut tables.posts, &post.id)?;
            let BlogPost {
                title,
                slug,
                excerpt,
                content,
                thumbnail_url,
                tags,
                status,
                author,
                updated_at,
                published_at,
                read_time,
                ..
            } = post;
            stored.title = title;
            stored.slug = slug;
            stored.excerpt = excerpt;
            stored.content = content;
            stored.thumbnail_url = thumbnail_url;
            stored.tags = tags;
            stored.status = status;
            stored.author = author;
            stored.updated_at = updated_at;
            stored.published_at = published_at;
            stored.read_time = read_time;
            stored.clone()
        };
        self.feed
            .publish(TableChange::new(Table::BlogPosts, ChangeKind::Update, &updated.id));
        Ok(updated)
    }

    async fn set_post_status(
        &self,
        id: &str,
        status: PostStatus,
        published_at: Option<DateTime<Utc>>,
    ) -> StoreResult<BlogPost> {
        let updated = {
            let mut tables = self.tables.write().await;
            let stored = find_post(&mut tables.posts, id)?;
            stored.status = status;
            stored.published_at = published_at;
            stored.updated_at = Utc::now();
            stored.clone()
        };
        self.feed
            .publish(TableChange::new(Table::BlogPosts, ChangeKind::Update, id));
        Ok(updated)
    }

    async fn replace_post_tags(&self, id: &str, tags: Vec<String>) -> StoreResult<BlogPost> {
        let updated = {
            let mut tables = self.tables.write().await;
            let stored = find_post(&mut tables.posts, id)?;
            stored.tags = tags;
            stored.updated_at = Utc::now();
            stored.clone()
        };
        self.feed
            .publish(TableChange::new(Table::BlogPosts, ChangeKind::Update, id));
        Ok(updated)
    }

    async fn delete_post(&self, id: &str) -> StoreResult<()> {
        {
            let mut tables = self.tables.write().await;
            let before = tables.posts.len();
            tables.posts.retain(|post| post.id != id);
            if tables.posts.len() == before {
                return Err(StoreError::not_found("post", id));
            }
        }
        self.feed
            .publish(TableChange::new(Table::BlogPosts, ChangeKind::Delete, id));
        Ok(())
    }

    async fn insert_subscriber(&self, subscriber: Subscriber) -> StoreResult<Subscriber> {
        {
            let mut tables = self.tables.write().await;
            if tables
                .subscribers
                .iter()
                .any(|existing| existing.email == subscriber.email)
            {
                return Err(StoreError::Conflict { field: "email" });
            }
            tables.subscribers.push(subscriber.clone());
        }
        self.feed.publish(TableChange::new(
            Table::Subscribers,
            ChangeKind::Insert,
            &subscriber.id,
        ));
        Ok(subscriber)
    }

    async fn subscribers(&self) -> StoreResult<Vec<Subscriber>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.subscribers.iter(), |row| row.subscribed_at))
    }

    async fn recent_subscribers(&self, limit: usize) -> StoreResult<Vec<Subscriber>> {
        let mut rows = self.subscribers().await?;
        rows.truncate(limit);
        Ok(rows)
    }

    async fn set_subscriber_status(
        &self,
        id: &str,
        status: SubscriberStatus,
    ) -> StoreResult<Subscriber> {
        let updated = {
            let mut tables = self.tables.write().await;
            let stored = tables
                .subscribers
                .iter_mut()
                .find(|row| row.id == id)
                .ok_or_else(|| StoreError::not_found("subscriber", id))?;
            stored.status = status;
            stored.clone()
        };
        self.feed
            .publish(TableChange::new(Table::Subscribers, ChangeKind::Update, id));
        Ok(updated)
    }

    async fn delete_subscriber(&self, id: &str) -> StoreResult<()> {
        {
            let mut tables = self.tables.write().await;
            let before = tables.subscribers.len();
            tables.subscribers.retain(|row| row.id != id);
            if tables.subscribers.len() == before {
                return Err(StoreError::not_found("subscriber", id));
            }
        }
        self.feed
            .publish(TableChange::new(Table::Subscribers, ChangeKind::Delete, id));
        Ok(())
    }

    async fn insert_suggestion(
        &self,
        suggestion: ContentSuggestion,
    ) -> StoreResult<ContentSuggestion> {
        self.tables.write().await.suggestions.push(suggestion.clone());
        self.feed.publish(TableChange::new(
            Table::ContentSuggestions,
            ChangeKind::Insert,
            &suggestion.id,
        ));
        Ok(suggestion)
    }

    async fn suggestions(&self) -> StoreResult<Vec<ContentSuggestion>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.suggestions.iter(), |row| row.created_at))
    }

    async fn recent_suggestions(&self, limit: usize) -> StoreResult<Vec<ContentSuggestion>> {
        let mut rows = self.suggestions().await?;
        rows.truncate(limit);
        Ok(rows)
    }

    async fn set_suggestion_status(
        &self,
        id: &str,
        status: SuggestionStatus,
    ) -> StoreResult<ContentSuggestion> {
        let updated = {
            let mut tables = self.tables.write().await;
            let stored = tables
                .suggestions
                .iter_mut()
                .find(|row| row.id == id)
                .ok_or_else(|| StoreError::not_found("suggestion", id))?;
            stored.status = status;
            stored.clone()
        };
        self.feed.publish(TableChange::new(
            Table::ContentSuggestions,
            ChangeKind::Update,
            id,
        ));
        Ok(updated)
    }

    async fn delete_suggestion(&self, id: &str) -> StoreResult<()> {
        {
            let mut tables = self.tables.write().await;
            let before = tables.suggestions.len();
            tables.suggestions.retain(|row| row.id != id);
            if tables.suggestions.len() == before {
                return Err(StoreError::not_found("suggestion", id));
            }
        }
        self.feed.publish(TableChange::new(
            Table::ContentSuggestions,
            ChangeKind::Delete,
            id,
        ));
        Ok(())
    }

    async fn dashboard_stats(&self) -> StoreResult<DashboardStats> {
        let tables = self.tables.read().await;
        Ok(DashboardStats {
            total_posts: tables.posts.len() as u64,
            total_subscribers: tables.subscribers.len() as u64,
            total_views: tables.posts.iter().map(|post| post.views).sum(),
            total_suggestions: tables.suggestions.len() as u64,
        })
    }

    fn changes(&self) -> broadcast::Receiver<TableChange> {
        self.feed.subscribe()
    }
}
