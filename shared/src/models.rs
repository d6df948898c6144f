//! Rows persisted by the content store and the aggregates built from them.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A status name that does not belong to the expected set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} status `{value}`")]
pub struct UnknownStatus {
    /// Which status family was being parsed (`post`, `subscriber`, ...).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Publication state of a blog post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Visible only in the admin console.
    Draft,
    /// Listed on the public site.
    Published,
}

impl PostStatus {
    /// Lowercase name used on the wire and in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

impl FromStr for PostStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            other => Err(UnknownStatus {
                kind: "post",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Newsletter subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    /// Receives the newsletter.
    Active,
    /// Opted out; the row is kept.
    Unsubscribed,
}

impl SubscriberStatus {
    /// Lowercase name used on the wire and in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Unsubscribed => "unsubscribed",
        }
    }
}

impl FromStr for SubscriberStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "unsubscribed" => Ok(Self::Unsubscribed),
            other => Err(UnknownStatus {
                kind: "subscriber",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SubscriberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Review state of a reader's content suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    /// Not looked at yet.
    Pending,
    /// Read by an admin.
    Reviewed,
    /// Turned into content.
    Implemented,
}

impl SuggestionStatus {
    /// Lowercase name used on the wire and in storage.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Implemented => "implemented",
        }
    }
}

impl FromStr for SuggestionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "reviewed" => Ok(Self::Reviewed),
            "implemented" => Ok(Self::Implemented),
            other => Err(UnknownStatus {
                kind: "suggestion",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A blog post row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    /// Opaque row id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// URL-safe identifier derived from the title; unique across posts.
    pub slug: String,
    /// Short teaser shown on cards.
    pub excerpt: String,
    /// Markdown body.
    pub content: String,
    /// Optional cover image.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Ordered, case-sensitive tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Draft or published.
    pub status: PostStatus,
    /// Author display name.
    pub author: String,
    /// Insert time.
    pub created_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
    /// Set while the post is published.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Estimated minutes to read.
    pub read_time: u32,
    /// Detail page loads; never decreases.
    pub views: i64,
}

impl BlogPost {
    /// Whether the post is visible on the public site.
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    /// Whether the two posts share at least one tag.
    pub fn shares_tag_with(&self, other: &BlogPost) -> bool {
        self.tags.iter().any(|tag| other.tags.contains(tag))
    }
}

/// A newsletter subscriber row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Opaque row id.
    pub id: String,
    /// Lower-cased, trimmed email; unique across subscribers.
    pub email: String,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Signup time.
    pub subscribed_at: DateTime<Utc>,
    /// Active or unsubscribed.
    pub status: SubscriberStatus,
}

/// A content idea submitted by a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSuggestion {
    /// Opaque row id.
    pub id: String,
    /// Submitter name.
    pub name: String,
    /// Submitter email, lower-cased.
    pub email: String,
    /// One-line topic.
    pub subject: String,
    /// Free-form body.
    pub message: String,
    /// Review state.
    pub status: SuggestionStatus,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// The persisted tables, as named by change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// `blog_posts`
    BlogPosts,
    /// `subscribers`
    Subscribers,
    /// `content_suggestions`
    ContentSuggestions,
}

impl Table {
    /// Every table, in dashboard order.
    pub const ALL: [Table; 3] = [Table::BlogPosts, Table::Subscribers, Table::ContentSuggestions];

    /// Storage name of the table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BlogPosts => "blog_posts",
            Self::Subscribers => "subscribers",
            Self::ContentSuggestions => "content_suggestions",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of row mutation carried by a [`TableChange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A row was created.
    Insert,
    /// A row was modified.
    Update,
    /// A row was removed.
    Delete,
}

/// Notification published after every successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableChange {
    /// Table that changed.
    pub table: Table,
    /// What happened to the row.
    pub kind: ChangeKind,
    /// Id of the affected row.
    pub id: String,
}

impl TableChange {
    /// Shorthand constructor.
    pub fn new(table: Table, kind: ChangeKind, id: impl Into<String>) -> Self {
        Self {
            table,
            kind,
            id: id.into(),
        }
    }
}

/// Aggregate counters shown at the top of the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Posts in any status.
    pub total_posts: u64,
    /// Subscribers in any status.
    pub total_subscribers: u64,
    /// Sum of `views` over all posts.
    pub total_views: i64,
    /// Suggestions in any status.
    pub total_suggestions: u64,
}

/// Everything the admin dashboard renders, fetched in one go.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// Aggregate counters.
    pub stats: DashboardStats,
    /// Newest posts by creation time.
    pub recent_posts: Vec<BlogPost>,
    /// Newest subscribers.
    pub recent_subscribers: Vec<Subscriber>,
    /// Newest suggestions.
    pub recent_suggestions: Vec<ContentSuggestion>,
    /// Most viewed posts.
    pub popular_posts: Vec<BlogPost>,
}
