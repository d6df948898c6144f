//! Page-level operations of the public site and the admin console.
//!
//! [`Site`] turns form input into rows, applies the listing rules from
//! [`crate::listing`] and maps store failures onto [`SiteError`], whose
//! [`SiteError::user_message`] is what a reader or admin gets to see.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::{
    content::{
        estimate_read_time, generate_slug, normalize_email, normalize_optional_text,
        normalize_tags,
    },
    listing::{
        aggregate_tags, filter_posts, split_featured, AdminPostFilter, PostFilter,
        SubscriberCounts, SubscriberFilter, SuggestionCounts, SuggestionFilter, TagInfo,
    },
    models::{
        BlogPost, ContentSuggestion, DashboardSnapshot, PostStatus, Subscriber, SubscriberStatus,
        SuggestionStatus, TableChange,
    },
    store::{ContentStore, StoreError},
};

/// Shown when a newsletter signup hits an existing email.
pub const ALREADY_SUBSCRIBED: &str = "This email is already subscribed!";
/// Shown when a post slug does not resolve to a published post.
pub const POST_NOT_FOUND: &str = "Post not found";
/// Fallback for failures the reader cannot act on.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";
/// Editor validation message.
pub const TITLE_AND_CONTENT_REQUIRED: &str = "Title and content are required";
/// Author used when the editor leaves the field blank.
pub const DEFAULT_AUTHOR: &str = "Admin";

/// Posts on the home page.
pub const HOME_POST_LIMIT: usize = 3;
/// Related posts under a post.
pub const RELATED_POST_LIMIT: usize = 3;
/// Rows per "recent" and "popular" dashboard panel.
pub const DASHBOARD_PANEL_LIMIT: usize = 5;

/// Failure of a site operation.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// The submitted form failed validation; the text is user-facing.
    #[error("{0}")]
    Invalid(String),
    /// No published post has the requested slug.
    #[error("Post not found")]
    PostNotFound,
    /// The newsletter already has this email.
    #[error("This email is already subscribed!")]
    AlreadySubscribed,
    /// Another post already uses the slug derived from the title.
    #[error("A post with the slug `{0}` already exists")]
    DuplicateSlug(String),
    /// The addressed row does not exist.
    #[error("{entity} `{id}` not found")]
    NotFound {
        /// Entity name.
        entity: &'static str,
        /// Requested id.
        id: String,
    },
    /// The store failed for a reason the caller cannot fix.
    #[error(transparent)]
    Store(StoreError),
}

impl SiteError {
    /// Whether the error stems from the request rather than the system.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Self::Store(_))
    }

    /// Text to show the user: the specific message for expected errors,
    /// `generic` for everything else.
    pub fn user_message(&self, generic: &str) -> String {
        if self.is_expected() {
            self.to_string()
        } else {
            generic.to_string()
        }
    }
}

impl From<StoreError> for SiteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Store(other),
        }
    }
}

/// Result alias for site operations.
pub type SiteResult<T> = Result<T, SiteError>;

/// The public blog listing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlogListing {
    /// First matching post.
    pub featured: Option<BlogPost>,
    /// Remaining matching posts.
    pub posts: Vec<BlogPost>,
    /// Tag sidebar over every published post, independent of the filter.
    pub tags: Vec<TagInfo>,
    /// Number of posts matching the filter, featured one included.
    pub total: usize,
}

/// A post detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostPage {
    /// The post, carrying the view count after this visit.
    pub post: BlogPost,
    /// Published posts sharing a tag with it.
    pub related: Vec<BlogPost>,
}

/// Newsletter signup form.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscribeForm {
    /// Email address as typed.
    pub email: String,
    /// Optional display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Content suggestion form.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SuggestionForm {
    /// Submitter name.
    pub name: String,
    /// Submitter email.
    pub email: String,
    /// Topic line.
    pub subject: String,
    /// Body.
    pub message: String,
}

/// Editable fields of the post editor.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PostDraft {
    /// Title; the slug is derived from it.
    pub title: String,
    /// Teaser.
    #[serde(default)]
    pub excerpt: String,
    /// Markdown body.
    pub content: String,
    /// Cover image.
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Tags in display order.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Author name; blank falls back to [`DEFAULT_AUTHOR`].
    #[serde(default)]
    pub author: Option<String>,
}

/// Admin subscriber list with per-status totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriberList {
    /// Subscribers matching the filter, newest first.
    pub subscribers: Vec<Subscriber>,
    /// Counts over all subscribers, ignoring the filter.
    pub counts: SubscriberCounts,
}

/// Admin suggestion list with per-status totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionList {
    /// Suggestions matching the filter, newest first.
    pub suggestions: Vec<ContentSuggestion>,
    /// Counts over all suggestions, ignoring the filter.
    pub counts: SuggestionCounts,
}

/// Every operation the pages perform, on top of a [`ContentStore`].
#[derive(Clone)]
pub struct Site {
    store: Arc<dyn ContentStore>,
}

impl Site {
    /// Wrap a store.
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Subscribe to the store's change feed.
    pub fn changes(&self) -> broadcast::Receiver<TableChange> {
        self.store.changes()
    }

    /// Latest published posts for the home page.
    pub async fn home_posts(&self) -> SiteResult<Vec<BlogPost>> {
        Ok(self.store.published_posts(Some(HOME_POST_LIMIT)).await?)
    }

    /// Published posts matching `filter`, split into featured and rest.
    pub async fn blog_listing(&self, filter: &PostFilter) -> SiteResult<BlogListing> {
        let published = self.store.published_posts(None).await?;
        let tags = aggregate_tags(&published);
        let matching = filter_posts(published, filter);
        let total = matching.len();
        let listing = split_featured(matching);
        Ok(BlogListing {
            featured: listing.featured,
            posts: listing.posts,
            tags,
            total,
        })
    }

    /// Tags of published posts with their counts.
    pub async fn tags(&self) -> SiteResult<Vec<TagInfo>> {
        let published = self.store.published_posts(None).await?;
        Ok(aggregate_tags(&published))
    }

    /// Load a published post by slug, count the visit and find related
    /// posts. A failed view count keeps the stored count; failed related
    /// posts come back empty.
    pub async fn read_post(&self, slug: &str) -> SiteResult<PostPage> {
        let mut post = self
            .store
            .published_post_by_slug(slug)
            .await?
            .ok_or(SiteError::PostNotFound)?;

        // Counting and related posts are best effort; only the fetch above
        // can fail the page.
        match self.store.record_view(&post.id).await {
            Ok(views) => post.views = views,
            Err(err) => tracing::warn!(id = %post.id, "failed to record post view: {err}"),
        }

        let related = if post.tags.is_empty() {
            Vec::new()
        } else {
            self.store
                .related_posts(&post, RELATED_POST_LIMIT)
                .await
                .unwrap_or_else(|err| {
                    tracing::warn!(id = %post.id, "failed to load related posts: {err}");
                    Vec::new()
                })
        };

        Ok(PostPage { post, related })
    }

    /// Add a newsletter subscriber.
    pub async fn subscribe(&self, form: SubscribeForm) -> SiteResult<Subscriber> {
        let email = normalize_email(&form.email);
        if !looks_like_email(&email) {
            return Err(SiteError::Invalid(
                "Please enter a valid email address".to_string(),
            ));
        }

        let subscriber = Subscriber {
            id: new_id(),
            email,
            name: normalize_optional_text(form.name),
            subscribed_at: Utc::now(),
            status: SubscriberStatus::Active,
        };

        match self.store.insert_subscriber(subscriber).await {
            Ok(subscriber) => {
                tracing::info!(id = %subscriber.id, "new newsletter subscriber");
                Ok(subscriber)
            },
            Err(StoreError::Conflict { .. }) => Err(SiteError::AlreadySubscribed),
            Err(err) => Err(err.into()),
        }
    }

    /// Store a reader's content suggestion as `pending`.
    pub async fn suggest(&self, form: SuggestionForm) -> SiteResult<ContentSuggestion> {
        let name = form.name.trim().to_string();
        let email = normalize_email(&form.email);
        let subject = form.subject.trim().to_string();
        let message = form.message.trim().to_string();

        if [&name, &email, &subject, &message]
            .iter()
            .any(|field| field.is_empty())
        {
            return Err(SiteError::Invalid("All fields are required".to_string()));
        }
        if !looks_like_email(&email) {
            return Err(SiteError::Invalid(
                "Please enter a valid email address".to_string(),
            ));
        }

        let suggestion = self
            .store
            .insert_suggestion(ContentSuggestion {
                id: new_id(),
                name,
                email,
                subject,
                message,
                status: SuggestionStatus::Pending,
                created_at: Utc::now(),
            })
            .await?;
        tracing::info!(id = %suggestion.id, "new content suggestion");
        Ok(suggestion)
    }

    /// Create (`id` absent) or update a post from the editor.
    ///
    /// The slug and read time are recomputed on every save. Saving as
    /// published keeps an existing `published_at` or stamps now; saving as
    /// draft clears it.
    pub async fn save_post(
        &self,
        id: Option<&str>,
        draft: PostDraft,
        status: PostStatus,
    ) -> SiteResult<BlogPost> {
        let title = draft.title.trim().to_string();
        if title.is_empty() || draft.content.trim().is_empty() {
            return Err(SiteError::Invalid(TITLE_AND_CONTENT_REQUIRED.to_string()));
        }
        let slug = generate_slug(&title);
        if slug.is_empty() {
            return Err(SiteError::Invalid(
                "Title must contain at least one letter or digit".to_string(),
            ));
        }

        let now = Utc::now();
        let existing = match id {
            Some(id) => Some(self.post(id).await?),
            None => None,
        };
        let published_at = match status {
            PostStatus::Published => existing
                .as_ref()
                .and_then(|post| post.published_at)
                .or(Some(now)),
            PostStatus::Draft => None,
        };

        let post = BlogPost {
            id: existing
                .as_ref()
                .map_or_else(new_id, |post| post.id.clone()),
            read_time: estimate_read_time(&draft.content),
            title,
            slug: slug.clone(),
            excerpt: draft.excerpt.trim().to_string(),
            content: draft.content,
            thumbnail_url: normalize_optional_text(draft.thumbnail_url),
            tags: normalize_tags(&draft.tags),
            status,
            author: normalize_optional_text(draft.author)
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            created_at: existing.as_ref().map_or(now, |post| post.created_at),
            updated_at: now,
            published_at,
            views: existing.as_ref().map_or(0, |post| post.views),
        };

        let saved = if existing.is_some() {
            self.store.update_post(post).await
        } else {
            self.store.insert_post(post).await
        };
        let saved = saved.map_err(|err| match err {
            StoreError::Conflict { .. } => SiteError::DuplicateSlug(slug),
            other => other.into(),
        })?;

        tracing::info!(
            id = %saved.id,
            slug = %saved.slug,
            status = %saved.status,
            created = existing.is_none(),
            "post saved"
        );
        Ok(saved)
    }

    /// Publish (stamping `published_at`) or unpublish (clearing it).
    pub async fn set_post_status(&self, id: &str, status: PostStatus) -> SiteResult<BlogPost> {
        let published_at = match status {
            PostStatus::Published => Some(Utc::now()),
            PostStatus::Draft => None,
        };
        Ok(self.store.set_post_status(id, status, published_at).await?)
    }

    /// Replace a post's tags with a cleaned copy of `tags`.
    pub async fn replace_tags(&self, id: &str, tags: Vec<String>) -> SiteResult<BlogPost> {
        Ok(self.store.replace_post_tags(id, normalize_tags(tags)).await?)
    }

    /// One post by id, any status.
    pub async fn post(&self, id: &str) -> SiteResult<BlogPost> {
        self.store
            .post(id)
            .await?
            .ok_or_else(|| SiteError::NotFound {
                entity: "post",
                id: id.to_string(),
            })
    }

    /// Delete a post.
    pub async fn delete_post(&self, id: &str) -> SiteResult<()> {
        self.store.delete_post(id).await?;
        tracing::info!(id, "post deleted");
        Ok(())
    }

    /// Admin post list.
    pub async fn admin_posts(&self, filter: &AdminPostFilter) -> SiteResult<Vec<BlogPost>> {
        let posts = self.store.all_posts().await?;
        Ok(posts.into_iter().filter(|post| filter.matches(post)).collect())
    }

    /// Admin subscriber list.
    pub async fn subscribers(&self, filter: &SubscriberFilter) -> SiteResult<SubscriberList> {
        let all = self.store.subscribers().await?;
        let counts = SubscriberCounts::tally(&all);
        let subscribers = all
            .into_iter()
            .filter(|subscriber| filter.matches(subscriber))
            .collect();
        Ok(SubscriberList {
            subscribers,
            counts,
        })
    }

    /// Change a subscriber's status.
    pub async fn set_subscriber_status(
        &self,
        id: &str,
        status: SubscriberStatus,
    ) -> SiteResult<Subscriber> {
        Ok(self.store.set_subscriber_status(id, status).await?)
    }

    /// Delete a subscriber.
    pub async fn delete_subscriber(&self, id: &str) -> SiteResult<()> {
        self.store.delete_subscriber(id).await?;
        tracing::info!(id, "subscriber deleted");
        Ok(())
    }

    /// Admin suggestion list.
    pub async fn suggestions(&self, filter: &SuggestionFilter) -> SiteResult<SuggestionList> {
        let all = self.store.suggestions().await?;
        let counts = SuggestionCounts::tally(&all);
        let suggestions = all
            .into_iter()
            .filter(|suggestion| filter.matches(suggestion))
            .collect();
        Ok(SuggestionList {
            suggestions,
            counts,
        })
    }

    /// Change a suggestion's status.
    pub async fn set_suggestion_status(
        &self,
        id: &str,
        status: SuggestionStatus,
    ) -> SiteResult<ContentSuggestion> {
        Ok(self.store.set_suggestion_status(id, status).await?)
    }

    /// Delete a suggestion.
    pub async fn delete_suggestion(&self, id: &str) -> SiteResult<()> {
        self.store.delete_suggestion(id).await?;
        tracing::info!(id, "suggestion deleted");
        Ok(())
    }

    /// Everything the admin dashboard shows.
    pub async fn dashboard(&self) -> SiteResult<DashboardSnapshot> {
        let (stats, recent_posts, recent_subscribers, recent_suggestions, popular_posts) = tokio::try_join!(
            self.store.dashboard_stats(),
            self.store.recent_posts(DASHBOARD_PANEL_LIMIT),
            self.store.recent_subscribers(DASHBOARD_PANEL_LIMIT),
            self.store.recent_suggestions(DASHBOARD_PANEL_LIMIT),
            self.store.popular_posts(DASHBOARD_PANEL_LIMIT),
        )?;
        Ok(DashboardSnapshot {
            stats,
            recent_posts,
            recent_subscribers,
            recent_suggestions,
            popular_posts,
        })
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Minimal shape check; delivery is what proves an address.
fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::DateTime;

    use super::*;
    use crate::{memory_store::MemoryStore, models::DashboardStats, store::StoreResult};

    fn site() -> Site {
        Site::new(Arc::new(MemoryStore::new()))
    }

    fn draft(title: &str, tags: &[&str]) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            excerpt: format!("About {title}"),
            content: "Some words for the body".to_string(),
            thumbnail_url: None,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            author: None,
        }
    }

    #[tokio::test]
    async fn save_post_derives_slug_read_time_and_author() {
        let site = site();
        let post = site
            .save_post(None, draft("Hello, World! 2024", &["DeFi", " DeFi ", ""]), PostStatus::Draft)
            .await
            .expect("save draft");

        assert_eq!(post.slug, "hello-world-2024");
        assert_eq!(post.read_time, 1);
        assert_eq!(post.author, DEFAULT_AUTHOR);
        assert_eq!(post.tags, vec!["DeFi".to_string()]);
        assert!(post.published_at.is_none());
    }

    #[tokio::test]
    async fn save_post_requires_title_and_content() {
        let site = site();
        let mut empty = draft("  ", &[]);
        let err = site
            .save_post(None, empty.clone(), PostStatus::Draft)
            .await
            .expect_err("blank title");
        assert_eq!(err.user_message(GENERIC_FAILURE), TITLE_AND_CONTENT_REQUIRED);

        empty.title = "Title".to_string();
        empty.content = "\n".to_string();
        let err = site
            .save_post(None, empty, PostStatus::Draft)
            .await
            .expect_err("blank content");
        assert!(matches!(err, SiteError::Invalid(_)));
    }

    #[tokio::test]
    async fn republishing_keeps_the_original_publish_time() {
        let site = site();
        let first = site
            .save_post(None, draft("Launch", &[]), PostStatus::Published)
            .await
            .expect("publish");
        let published_at = first.published_at.expect("stamped on publish");

        tokio::time::sleep(Duration::from_millis(5)).await;
        let mut edit = draft("Launch day", &[]);
        edit.author = Some("  Grace ".to_string());
        let edited = site
            .save_post(Some(&first.id), edit, PostStatus::Published)
            .await
            .expect("update");
        assert_eq!(edited.published_at, Some(published_at));
        assert_eq!(edited.slug, "launch-day");
        assert_eq!(edited.author, "Grace");
        assert_eq!(edited.created_at, first.created_at);

        let unpublished = site
            .save_post(Some(&first.id), draft("Launch day", &[]), PostStatus::Draft)
            .await
            .expect("back to draft");
        assert!(unpublished.published_at.is_none());
    }

    #[tokio::test]
    async fn saving_an_unknown_id_is_not_found() {
        let err = site()
            .save_post(Some("missing"), draft("Ghost", &[]), PostStatus::Draft)
            .await
            .expect_err("no such post");
        assert!(matches!(err, SiteError::NotFound { entity: "post", .. }));
        assert!(err.is_expected());
    }

    #[tokio::test]
    async fn duplicate_titles_collide_on_slug() {
        let site = site();
        site.save_post(None, draft("Same title", &[]), PostStatus::Draft)
            .await
            .expect("first");
        let err = site
            .save_post(None, draft("Same  Title!", &[]), PostStatus::Draft)
            .await
            .expect_err("slug taken");
        assert!(matches!(err, SiteError::DuplicateSlug(ref slug) if slug == "same-title"));
    }

    #[tokio::test]
    async fn toggling_status_stamps_and_clears_publish_time() {
        let site = site();
        let post = site
            .save_post(None, draft("Toggle", &[]), PostStatus::Draft)
            .await
            .expect("draft");

        let published = site
            .set_post_status(&post.id, PostStatus::Published)
            .await
            .expect("publish");
        assert!(published.published_at.is_some());

        let drafted = site
            .set_post_status(&post.id, PostStatus::Draft)
            .await
            .expect("unpublish");
        assert!(drafted.published_at.is_none());
    }

    #[tokio::test]
    async fn read_post_counts_views_and_finds_related() {
        let site = site();
        let main = site
            .save_post(None, draft("Main", &["DeFi"]), PostStatus::Published)
            .await
            .expect("main");
        site.save_post(None, draft("Sibling", &["DeFi", "NFT"]), PostStatus::Published)
            .await
            .expect("sibling");
        site.save_post(None, draft("Hidden", &["DeFi"]), PostStatus::Draft)
            .await
            .expect("hidden");

        let first = site.read_post(&main.slug).await.expect("first visit");
        assert_eq!(first.post.views, 1);
        let second = site.read_post(&main.slug).await.expect("second visit");
        assert_eq!(second.post.views, 2);
        let related: Vec<&str> = second.related.iter().map(|post| post.slug.as_str()).collect();
        assert_eq!(related, vec!["sibling"]);
    }

    #[tokio::test]
    async fn untagged_post_has_no_related_posts() {
        let site = site();
        let post = site
            .save_post(None, draft("Loner", &[]), PostStatus::Published)
            .await
            .expect("save");
        site.save_post(None, draft("Other", &[]), PostStatus::Published)
            .await
            .expect("save");
        let page = site.read_post(&post.slug).await.expect("read");
        assert!(page.related.is_empty());
    }

    /// Memory store whose view counter and related-posts query always fail.
    struct FailingReads {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl ContentStore for FailingReads {
        async fn published_posts(&self, limit: Option<usize>) -> StoreResult<Vec<BlogPost>> {
            self.inner.published_posts(limit).await
        }

        async fn published_post_by_slug(&self, slug: &str) -> StoreResult<Option<BlogPost>> {
            self.inner.published_post_by_slug(slug).await
        }

        async fn record_view(&self, _id: &str) -> StoreResult<i64> {
            Err(StoreError::Backend(anyhow::anyhow!("write failed")))
        }

        async fn related_posts(&self, _post: &BlogPost, _limit: usize) -> StoreResult<Vec<BlogPost>> {
            Err(StoreError::Backend(anyhow::anyhow!("query failed")))
        }

        async fn all_posts(&self) -> StoreResult<Vec<BlogPost>> {
            self.inner.all_posts().await
        }

        async fn recent_posts(&self, limit: usize) -> StoreResult<Vec<BlogPost>> {
            self.inner.recent_posts(limit).await
        }

        async fn popular_posts(&self, limit: usize) -> StoreResult<Vec<BlogPost>> {
            self.inner.popular_posts(limit).await
        }

        async fn post(&self, id: &str) -> StoreResult<Option<BlogPost>> {
            self.inner.post(id).await
        }

        async fn insert_post(&self, post: BlogPost) -> StoreResult<BlogPost> {
            self.inner.insert_post(post).await
        }

        async fn update_post(&self, post: BlogPost) -> StoreResult<BlogPost> {
            self.inner.update_post(post).await
        }

        async fn set_post_status(
            &self,
            id: &str,
            status: PostStatus,
            published_at: Option<DateTime<Utc>>,
        ) -> StoreResult<BlogPost> {
            self.inner.set_post_status(id, status, published_at).await
        }

        async fn replace_post_tags(&self, id: &str, tags: Vec<String>) -> StoreResult<BlogPost> {
            self.inner.replace_post_tags(id, tags).await
        }

        async fn delete_post(&self, id: &str) -> StoreResult<()> {
            self.inner.delete_post(id).await
        }

        async fn insert_subscriber(&self, subscriber: Subscriber) -> StoreResult<Subscriber> {
            self.inner.insert_subscriber(subscriber).await
        }

        async fn subscribers(&self) -> StoreResult<Vec<Subscriber>> {
            self.inner.subscribers().await
        }

        async fn recent_subscribers(&self, limit: usize) -> StoreResult<Vec<Subscriber>> {
            self.inner.recent_subscribers(limit).await
        }

        async fn set_subscriber_status(
            &self,
            id: &str,
            status: SubscriberStatus,
        ) -> StoreResult<Subscriber> {
            self.inner.set_subscriber_status(id, status).await
        }

        async fn delete_subscriber(&self, id: &str) -> StoreResult<()> {
            self.inner.delete_subscriber(id).await
        }

        async fn insert_suggestion(
            &self,
            suggestion: ContentSuggestion,
        ) -> StoreResult<ContentSuggestion> {
            self.inner.insert_suggestion(suggestion).await
        }

        async fn suggestions(&self) -> StoreResult<Vec<ContentSuggestion>> {
            self.inner.suggestions().await
        }

        async fn recent_suggestions(&self, limit: usize) -> StoreResult<Vec<ContentSuggestion>> {
            self.inner.recent_suggestions(limit).await
        }

        async fn set_suggestion_status(
            &self,
            id: &str,
            status: SuggestionStatus,
        ) -> StoreResult<ContentSuggestion> {
            self.inner.set_suggestion_status(id, status).await
        }

        async fn delete_suggestion(&self, id: &str) -> StoreResult<()> {
            self.inner.delete_suggestion(id).await
        }

        async fn dashboard_stats(&self) -> StoreResult<DashboardStats> {
            self.inner.dashboard_stats().await
        }

        fn changes(&self) -> broadcast::Receiver<TableChange> {
            self.inner.changes()
        }
    }

    #[tokio::test]
    async fn read_post_survives_view_and_related_failures() {
        let site = Site::new(Arc::new(FailingReads {
            inner: MemoryStore::new(),
        }));
        let post = site
            .save_post(None, draft("Readable", &["DeFi"]), PostStatus::Published)
            .await
            .expect("save");
        site.save_post(None, draft("Sibling", &["DeFi"]), PostStatus::Published)
            .await
            .expect("sibling");

        let page = site.read_post("readable").await.expect("page still served");
        assert_eq!(page.post.id, post.id);
        assert_eq!(page.post.views, 0);
        assert!(page.related.is_empty());
    }

    #[tokio::test]
    async fn drafts_are_not_readable_by_slug() {
        let site = site();
        let post = site
            .save_post(None, draft("Secret", &[]), PostStatus::Draft)
            .await
            .expect("save");
        let err = site.read_post(&post.slug).await.expect_err("draft");
        assert!(matches!(err, SiteError::PostNotFound));
        assert_eq!(err.user_message(GENERIC_FAILURE), POST_NOT_FOUND);
    }

    #[tokio::test]
    async fn blog_listing_features_first_match_and_counts_all_tags() {
        let site = site();
        for (title, tags) in [("Alpha", vec!["a"]), ("Beta", vec!["a", "b"]), ("Gamma", vec!["b"])] {
            site.save_post(None, draft(title, &tags), PostStatus::Published)
                .await
                .expect("save");
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let listing = site
            .blog_listing(&PostFilter {
                q: String::new(),
                tag: Some("a".to_string()),
            })
            .await
            .expect("listing");
        assert_eq!(listing.total, 2);
        assert_eq!(listing.featured.map(|post| post.title), Some("Beta".to_string()));
        assert_eq!(listing.posts.len(), 1);
        let counts: Vec<(String, usize)> = listing
            .tags
            .into_iter()
            .map(|tag| (tag.name, tag.count))
            .collect();
        assert_eq!(counts, vec![("a".to_string(), 2), ("b".to_string(), 2)]);

        let home = site.home_posts().await.expect("home");
        let titles: Vec<&str> = home.iter().map(|post| post.title.as_str()).collect();
        assert_eq!(titles, vec!["Gamma", "Beta", "Alpha"]);
    }

    #[tokio::test]
    async fn duplicate_subscription_is_reported() {
        let site = site();
        let subscriber = site
            .subscribe(SubscribeForm {
                email: "  Reader@Example.com ".to_string(),
                name: Some("   ".to_string()),
            })
            .await
            .expect("subscribe");
        assert_eq!(subscriber.email, "reader@example.com");
        assert_eq!(subscriber.name, None);
        assert_eq!(subscriber.status, SubscriberStatus::Active);

        let err = site
            .subscribe(SubscribeForm {
                email: "reader@example.com".to_string(),
                name: None,
            })
            .await
            .expect_err("duplicate");
        assert_eq!(err.user_message(GENERIC_FAILURE), ALREADY_SUBSCRIBED);
    }

    #[tokio::test]
    async fn suggestions_are_trimmed_and_pending() {
        let site = site();
        let suggestion = site
            .suggest(SuggestionForm {
                name: " Ada ".to_string(),
                email: "ADA@example.com".to_string(),
                subject: " Rollups ".to_string(),
                message: "Please explain them.\n".to_string(),
            })
            .await
            .expect("suggest");
        assert_eq!(suggestion.name, "Ada");
        assert_eq!(suggestion.email, "ada@example.com");
        assert_eq!(suggestion.subject, "Rollups");
        assert_eq!(suggestion.status, SuggestionStatus::Pending);

        let err = site
            .suggest(SuggestionForm {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                subject: " ".to_string(),
                message: "body".to_string(),
            })
            .await
            .expect_err("blank subject");
        assert!(matches!(err, SiteError::Invalid(_)));
    }

    #[tokio::test]
    async fn admin_lists_filter_but_count_everything() {
        let site = site();
        for email in ["a@example.com", "b@example.com"] {
            site.subscribe(SubscribeForm {
                email: email.to_string(),
                name: None,
            })
            .await
            .expect("subscribe");
        }
        let all = site
            .subscribers(&SubscriberFilter::default())
            .await
            .expect("list");
        let first = &all.subscribers[0];
        site.set_subscriber_status(&first.id, SubscriberStatus::Unsubscribed)
            .await
            .expect("unsubscribe");

        let active = site
            .subscribers(&SubscriberFilter {
                q: String::new(),
                status: Some(SubscriberStatus::Active),
            })
            .await
            .expect("filtered");
        assert_eq!(active.subscribers.len(), 1);
        assert_eq!(active.counts.total, 2);
        assert_eq!(active.counts.unsubscribed, 1);
    }

    #[tokio::test]
    async fn dashboard_collects_stats_and_panels() {
        let site = site();
        for index in 0..6 {
            site.save_post(None, draft(&format!("Post {index}"), &[]), PostStatus::Published)
                .await
                .expect("save");
        }
        let popular = site.read_post("post-3").await.expect("read");
        site.subscribe(SubscribeForm {
            email: "reader@example.com".to_string(),
            name: None,
        })
        .await
        .expect("subscribe");

        let snapshot = site.dashboard().await.expect("dashboard");
        assert_eq!(snapshot.stats.total_posts, 6);
        assert_eq!(snapshot.stats.total_subscribers, 1);
        assert_eq!(snapshot.stats.total_views, 1);
        assert_eq!(snapshot.recent_posts.len(), DASHBOARD_PANEL_LIMIT);
        assert_eq!(snapshot.popular_posts[0].id, popular.post.id);
        assert_eq!(snapshot.recent_subscribers.len(), 1);
    }

    #[test]
    fn unexpected_errors_hide_their_details() {
        let err = SiteError::from(StoreError::Backend(anyhow::anyhow!("disk on fire")));
        assert!(!err.is_expected());
        assert_eq!(err.user_message(GENERIC_FAILURE), GENERIC_FAILURE);
    }
}
