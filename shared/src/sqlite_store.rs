//! SQLite-backed [`ContentStore`].
//!
//! One connection guarded by a mutex; every call runs on the blocking pool.
//! Tags are stored as a JSON array and matched with `json_each`.

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{ffi, params, types::Type, Connection, OptionalExtension, Row};
use tokio::sync::broadcast;

use crate::{
    models::{
        BlogPost, ChangeKind, ContentSuggestion, DashboardStats, PostStatus, Subscriber,
        SubscriberStatus, SuggestionStatus, Table, TableChange,
    },
    store::{ChangeFeed, ContentStore, StoreError, StoreResult},
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS blog_posts (
    id            TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    slug          TEXT NOT NULL UNIQUE,
    excerpt       TEXT NOT NULL DEFAULT '',
    content       TEXT NOT NULL,
    thumbnail_url TEXT,
    tags          TEXT NOT NULL DEFAULT '[]',
    status        TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'published')),
    author        TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    published_at  TEXT,
    read_time     INTEGER NOT NULL DEFAULT 1,
    views         INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_blog_posts_status_published
    ON blog_posts (status, published_at);

CREATE TABLE IF NOT EXISTS subscribers (
    id            TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    name          TEXT,
    subscribed_at TEXT NOT NULL,
    status        TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'unsubscribed'))
);

CREATE TABLE IF NOT EXISTS content_suggestions (
    id         TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    email      TEXT NOT NULL,
    subject    TEXT NOT NULL,
    message    TEXT NOT NULL,
    status     TEXT NOT NULL DEFAULT 'pending'
               CHECK (status IN ('pending', 'reviewed', 'implemented')),
    created_at TEXT NOT NULL
);
"#;

const POST_COLUMNS: &str = "id, title, slug, excerpt, content, thumbnail_url, tags, status, \
                            author, created_at, updated_at, published_at, read_time, views";
const SUBSCRIBER_COLUMNS: &str = "id, email, name, subscribed_at, status";
const SUGGESTION_COLUMNS: &str = "id, name, email, subject, message, status, created_at";

/// Content store persisted in a SQLite database file.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    feed: ChangeFeed,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    /// `":memory:"` gives a private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open sqlite database {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// Apply the schema to an already open connection.
    pub fn from_connection(conn: Connection) -> anyhow::Result<Self> {
        conn.busy_timeout(Duration::from_secs(5))
            .context("failed to set sqlite busy timeout")?;
        conn.execute_batch(SCHEMA)
            .context("failed to apply content schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            feed: ChangeFeed::new(),
        })
    }

    async fn call<T, F>(&self, op: &'static str, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await
        .with_context(|| format!("sqlite task `{op}` did not complete"))?
    }

    async fn fetch_post(&self, id: &str) -> StoreResult<BlogPost> {
        self.post(id)
            .await?
            .ok_or_else(|| StoreError::not_found("post", id))
    }
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn row_to_post(row: &Row<'_>) -> rusqlite::Result<BlogPost> {
    let tags: String = row.get(6)?;
    let status: String = row.get(7)?;
    Ok(BlogPost {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        excerpt: row.get(3)?,
        content: row.get(4)?,
        thumbnail_url: row.get(5)?,
        tags: serde_json::from_str(&tags).map_err(|err| conversion_error(6, err))?,
        status: status.parse().map_err(|err| conversion_error(7, err))?,
        author: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        published_at: row.get(11)?,
        read_time: row.get(12)?,
        views: row.get(13)?,
    })
}

fn row_to_subscriber(row: &Row<'_>) -> rusqlite::Result<Subscriber> {
    let status: String = row.get(4)?;
    Ok(Subscriber {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        subscribed_at: row.get(3)?,
        status: status.parse().map_err(|err| conversion_error(4, err))?,
    })
}

fn row_to_suggestion(row: &Row<'_>) -> rusqlite::Result<ContentSuggestion> {
    let status: String = row.get(5)?;
    Ok(ContentSuggestion {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        subject: row.get(3)?,
        message: row.get(4)?,
        status: status.parse().map_err(|err| conversion_error(5, err))?,
        created_at: row.get(6)?,
    })
}

fn query_posts(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> anyhow::Result<Vec<BlogPost>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params, row_to_post)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

fn tags_json(tags: &[String]) -> anyhow::Result<String> {
    serde_json::to_string(tags).context("failed to encode tags")
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Map a write error, turning unique violations into conflicts on `field`.
fn write_error(err: rusqlite::Error, field: &'static str, what: &str) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict { field }
    } else {
        StoreError::Backend(anyhow::Error::new(err).context(format!("failed to {what}")))
    }
}

fn ensure_changed(changed: usize, entity: &'static str, id: &str) -> StoreResult<()> {
    if changed == 0 {
        Err(StoreError::not_found(entity, id))
    } else {
        Ok(())
    }
}

fn limit_param(limit: Option<usize>) -> i64 {
    // SQLite treats a negative LIMIT as unbounded.
    limit.map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX))
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn published_posts(&self, limit: Option<usize>) -> StoreResult<Vec<BlogPost>> {
        let limit = limit_param(limit);
        self.call("published_posts", move |conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM blog_posts WHERE status = 'published' \
                 ORDER BY published_at DESC, rowid DESC LIMIT ?1"
            );
            Ok(query_posts(conn, &sql, params![limit]).context("failed to list published posts")?)
        })
        .await
    }

    async fn published_post_by_slug(&self, slug: &str) -> StoreResult<Option<BlogPost>> {
        let slug = slug.to_string();
        self.call("published_post_by_slug", move |conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM blog_posts WHERE slug = ?1 AND status = 'published'"
            );
            Ok(conn
                .query_row(&sql, params![slug], row_to_post)
                .optional()
                .context("failed to read post by slug")?)
        })
        .await
    }

    async fn record_view(&self, id: &str) -> StoreResult<i64> {
        let owned = id.to_string();
        let views = self
            .call("record_view", move |conn| {
                let views: Option<i64> = conn
                    .query_row(
                        "UPDATE blog_posts SET views = views + 1 WHERE id = ?1 RETURNING views",
                        params![owned],
                        |row| row.get(0),
                    )
                    .optional()
                    .context("failed to increment views")?;
                views.ok_or_else(|| StoreError::not_found("post", &owned))
            })
            .await?;
        self.feed
            .publish(TableChange::new(Table::BlogPosts, ChangeKind::Update, id));
        Ok(views)
    }

    async fn related_posts(&self, post: &BlogPost, limit: usize) -> StoreResult<Vec<BlogPost>> {
        let id = post.id.clone();
        let tags = tags_json(&post.tags)?;
        let limit = limit_param(Some(limit));
        self.call("related_posts", move |conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM blog_posts AS p \
                 WHERE p.status = 'published' AND p.id != ?1 \
                   AND EXISTS ( \
                       SELECT 1 FROM json_each(p.tags) AS mine \
                       WHERE mine.value IN (SELECT value FROM json_each(?2)) \
                   ) \
                 ORDER BY p.published_at DESC, p.rowid DESC LIMIT ?3"
            );
            Ok(query_posts(conn, &sql, params![id, tags, limit])
                .context("failed to list related posts")?)
        })
        .await
    }

    async fn all_posts(&self) -> StoreResult<Vec<BlogPost>> {
        self.call("all_posts", |conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM blog_posts ORDER BY created_at DESC, rowid DESC"
            );
            Ok(query_posts(conn, &sql, []).context("failed to list posts")?)
        })
        .await
    }

    async fn recent_posts(&self, limit: usize) -> StoreResult<Vec<BlogPost>> {
        let limit = limit_param(Some(limit));
        self.call("recent_posts", move |conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM blog_posts \
                 ORDER BY created_at DESC, rowid DESC LIMIT ?1"
            );
            Ok(query_posts(conn, &sql, params![limit]).context("failed to list recent posts")?)
        })
        .await
    }

    async fn popular_posts(&self, limit: usize) -> StoreResult<Vec<BlogPost>> {
        let limit = limit_param(Some(limit));
        self.call("popular_posts", move |conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM blog_posts \
                 ORDER BY views DESC, created_at DESC LIMIT ?1"
            );
            Ok(query_posts(conn, &sql, params![limit]).context("failed to list popular posts")?)
        })
        .await
    }

    async fn post(&self, id: &str) -> StoreResult<Option<BlogPost>> {
        let id = id.to_string();
        self.call("post", move |conn| {
            let sql = format!("SELECT {POST_COLUMNS} FROM blog_posts WHERE id = ?1");
            Ok(conn
                .query_row(&sql, params![id], row_to_post)
                .optional()
                .context("failed to read post")?)
        })
        .await
    }

    async fn insert_post(&self, post: BlogPost) -> StoreResult<BlogPost> {
        let tags = tags_json(&post.tags)?;
        let row = post.clone();
        self.call("insert_post", move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO blog_posts ({POST_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                params![
                    row.id,
                    row.title,
                    row.slug,
                    row.excerpt,
                    row.content,
                    row.thumbnail_url,
                    tags,
                    row.status.as_str(),
                    row.author,
                    row.created_at,
                    row.updated_at,
                    row.published_at,
                    row.read_time,
                    row.views,
                ],
            )
            .map_err(|err| write_error(err, "slug", "insert post"))?;
            Ok(())
        })
        .await?;
        self.feed
            .publish(TableChange::new(Table::BlogPosts, ChangeKind::Insert, &post.id));
        Ok(post)
    }

    async fn update_post(&self, post: BlogPost) -> StoreResult<BlogPost> {
        let tags = tags_json(&post.tags)?;
        let id = post.id.clone();
        self.call("update_post", move |conn| {
            let changed = conn
                .execute(
                    "UPDATE blog_posts SET title = ?2, slug = ?3, excerpt = ?4, content = ?5, \
                     thumbnail_url = ?6, tags = ?7, status = ?8, author = ?9, updated_at = ?10, \
                     published_at = ?11, read_time = ?12 WHERE id = ?1",
                    params![
                        post.id,
                        post.title,
                        post.slug,
                        post.excerpt,
                        post.content,
                        post.thumbnail_url,
                        tags,
                        post.status.as_str(),
                        post.author,
                        post.updated_at,
                        post.published_at,
                        post.read_time,
                    ],
                )
                .map_err(|err| write_error(err, "slug", "update post"))?;
            ensure_changed(changed, "post", &post.id)
        })
        .await?;
        self.feed
            .publish(TableChange::new(Table::BlogPosts, ChangeKind::Update, &id));
        self.fetch_post(&id).await
    }

    async fn set_post_status(
        &self,
        id: &str,
        status: PostStatus,
        published_at: Option<DateTime<Utc>>,
    ) -> StoreResult<BlogPost> {
        let owned = id.to_string();
        self.call("set_post_status", move |conn| {
            let changed = conn
                .execute(
                    "UPDATE blog_posts SET status = ?2, published_at = ?3, updated_at = ?4 \
                     WHERE id = ?1",
                    params![owned, status.as_str(), published_at, Utc::now()],
                )
                .context("failed to update post status")?;
            ensure_changed(changed, "post", &owned)
        })
        .await?;
        self.feed
            .publish(TableChange::new(Table::BlogPosts, ChangeKind::Update, id));
        self.fetch_post(id).await
    }

    async fn replace_post_tags(&self, id: &str, tags: Vec<String>) -> StoreResult<BlogPost> {
        let owned = id.to_string();
        let tags = tags_json(&tags)?;
        self.call("replace_post_tags", move |conn| {
            let changed = conn
                .execute(
                    "UPDATE blog_posts SET tags = ?2, updated_at = ?3 WHERE id = ?1",
                    params![owned, tags, Utc::now()],
                )
                .context("failed to replace post tags")?;
            ensure_changed(changed, "post", &owned)
        })
        .await?;
        self.feed
            .publish(TableChange::new(Table::BlogPosts, ChangeKind::Update, id));
        self.fetch_post(id).await
    }

    async fn delete_post(&self, id: &str) -> StoreResult<()> {
        let owned = id.to_string();
        self.call("delete_post", move |conn| {
            let changed = conn
                .execute("DELETE FROM blog_posts WHERE id = ?1", params![owned])
                .context("failed to delete post")?;
            ensure_changed(changed, "post", &owned)
        })
        .await?;
        self.feed
            .publish(TableChange::new(Table::BlogPosts, ChangeKind::Delete, id));
        Ok(())
    }

    async fn insert_subscriber(&self, subscriber: Subscriber) -> StoreResult<Subscriber> {
        let row = subscriber.clone();
        self.call("insert_subscriber", move |conn| {
            conn.execute(
                &format!("INSERT INTO subscribers ({SUBSCRIBER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
                params![row.id, row.email, row.name, row.subscribed_at, row.status.as_str()],
            )
            .map_err(|err| write_error(err, "email", "insert subscriber"))?;
            Ok(())
        })
        .await?;
        self.feed.publish(TableChange::new(
            Table::Subscribers,
            ChangeKind::Insert,
            &subscriber.id,
        ));
        Ok(subscriber)
    }

    async fn subscribers(&self) -> StoreResult<Vec<Subscriber>> {
        self.recent_subscribers_limited(None).await
    }

    async fn recent_subscribers(&self, limit: usize) -> StoreResult<Vec<Subscriber>> {
        self.recent_subscribers_limited(Some(limit)).await
    }

    async fn set_subscriber_status(
        &self,
        id: &str,
        status: SubscriberStatus,
    ) -> StoreResult<Subscriber> {
        let owned = id.to_string();
        let updated = self
            .call("set_subscriber_status", move |conn| {
                let changed = conn
                    .execute(
                        "UPDATE subscribers SET status = ?2 WHERE id = ?1",
                        params![owned, status.as_str()],
                    )
                    .context("failed to update subscriber status")?;
                ensure_changed(changed, "subscriber", &owned)?;
                Ok(conn
                    .query_row(
                        &format!("SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE id = ?1"),
                        params![owned],
                        row_to_subscriber,
                    )
                    .context("failed to read subscriber")?)
            })
            .await?;
        self.feed
            .publish(TableChange::new(Table::Subscribers, ChangeKind::Update, id));
        Ok(updated)
    }

    async fn delete_subscriber(&self, id: &str) -> StoreResult<()> {
        let owned = id.to_string();
        self.call("delete_subscriber", move |conn| {
            let changed = conn
                .execute("DELETE FROM subscribers WHERE id = ?1", params![owned])
                .context("failed to delete subscriber")?;
            ensure_changed(changed, "subscriber", &owned)
        })
        .await?;
        self.feed
            .publish(TableChange::new(Table::Subscribers, ChangeKind::Delete, id));
        Ok(())
    }

    async fn insert_suggestion(
        &self,
        suggestion: ContentSuggestion,
    ) -> StoreResult<ContentSuggestion> {
        let row = suggestion.clone();
        self.call("insert_suggestion", move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO content_suggestions ({SUGGESTION_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                ),
                params![
                    row.id,
                    row.name,
                    row.email,
                    row.subject,
                    row.message,
                    row.status.as_str(),
                    row.created_at,
                ],
            )
            .context("failed to insert suggestion")?;
            Ok(())
        })
        .await?;
        self.feed.publish(TableChange::new(
            Table::ContentSuggestions,
            ChangeKind::Insert,
            &suggestion.id,
        ));
        Ok(suggestion)
    }

    async fn suggestions(&self) -> StoreResult<Vec<ContentSuggestion>> {
        self.recent_suggestions_limited(None).await
    }

    async fn recent_suggestions(&self, limit: usize) -> StoreResult<Vec<ContentSuggestion>> {
        self.recent_suggestions_limited(Some(limit)).await
    }

    async fn set_suggestion_status(
        &self,
        id: &str,
        status: SuggestionStatus,
    ) -> StoreResult<ContentSuggestion> {
        let owned = id.to_string();
        let updated = self
            .call("set_suggestion_status", move |conn| {
                let changed = conn
                    .execute(
                        "UPDATE content_suggestions SET status = ?2 WHERE id = ?1",
                        params![owned, status.as_str()],
                    )
                    .context("failed to update suggestion status")?;
                ensure_changed(changed, "suggestion", &owned)?;
                Ok(conn
                    .query_row(
                        &format!(
                            "SELECT {SUGGESTION_COLUMNS} FROM content_suggestions WHERE id = ?1"
                        ),
                        params![owned],
                        row_to_suggestion,
                    )
                    .context("failed to read suggestion")?)
            })
            .await?;
        self.feed.publish(TableChange::new(
            Table::ContentSuggestions,
            ChangeKind::Update,
            id,
        ));
        Ok(updated)
    }

    async fn delete_suggestion(&self, id: &str) -> StoreResult<()> {
        let owned = id.to_string();
        self.call("delete_suggestion", move |conn| {
            let changed = conn
                .execute("DELETE FROM content_suggestions WHERE id = ?1", params![owned])
                .context("failed to delete suggestion")?;
            ensure_changed(changed, "suggestion", &owned)
        })
        .await?;
        self.feed.publish(TableChange::new(
            Table::ContentSuggestions,
            ChangeKind::Delete,
            id,
        ));
        Ok(())
    }

    async fn dashboard_stats(&self) -> StoreResult<DashboardStats> {
        self.call("dashboard_stats", |conn| {
            let stats = conn
                .query_row(
                    "SELECT \
                        (SELECT COUNT(*) FROM blog_posts), \
                        (SELECT COUNT(*) FROM subscribers), \
                        (SELECT COALESCE(SUM(views), 0) FROM blog_posts), \
                        (SELECT COUNT(*) FROM content_suggestions)",
                    [],
                    |row| {
                        Ok(DashboardStats {
                            total_posts: row.get(0)?,
                            total_subscribers: row.get(1)?,
                            total_views: row.get(2)?,
                            total_suggestions: row.get(3)?,
                        })
                    },
                )
                .context("failed to compute dashboard stats")?;
            Ok(stats)
        })
        .await
    }

    fn changes(&self) -> broadcast::Receiver<TableChange> {
        self.feed.subscribe()
    }
}

impl SqliteStore {
    async fn recent_subscribers_limited(&self, limit: Option<usize>) -> StoreResult<Vec<Subscriber>> {
        let limit = limit_param(limit);
        self.call("subscribers", move |conn| {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers \
                     ORDER BY subscribed_at DESC, rowid DESC LIMIT ?1"
                ))
                .context("failed to prepare subscriber query")?;
            let rows = stmt
                .query_map(params![limit], row_to_subscriber)
                .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
                .context("failed to list subscribers")?;
            Ok(rows)
        })
        .await
    }

    async fn recent_suggestions_limited(
        &self,
        limit: Option<usize>,
    ) -> StoreResult<Vec<ContentSuggestion>> {
        let limit = limit_param(limit);
        self.call("suggestions", move |conn| {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {SUGGESTION_COLUMNS} FROM content_suggestions \
                     ORDER BY created_at DESC, rowid DESC LIMIT ?1"
                ))
                .context("failed to prepare suggestion query")?;
            let rows = stmt
                .query_map(params![limit], row_to_suggestion)
                .and_then(|rows| rows.collect::<rusqlite::Result<Vec<_>>>())
                .context("failed to list suggestions")?;
            Ok(rows)
        })
        .await
    }
}
