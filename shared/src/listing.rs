//! In-memory search, filtering and aggregation over fetched rows.
//!
//! Every function here preserves the order of its input; callers fetch rows
//! already sorted the way they want them displayed.

use std::{collections::HashMap, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::models::{
    BlogPost, ContentSuggestion, PostStatus, Subscriber, SubscriberStatus, SuggestionStatus,
    UnknownStatus,
};

/// Search box and tag selection of the public blog listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFilter {
    /// Free-text query, matched case-insensitively.
    #[serde(default)]
    pub q: String,
    /// Selected tag, matched exactly.
    #[serde(default)]
    pub tag: Option<String>,
}

impl PostFilter {
    /// Whether `post` passes both the query and the tag selection.
    pub fn matches(&self, post: &BlogPost) -> bool {
        let needle = self.q.to_lowercase();
        let matches_search = contains_folded(&post.title, &needle)
            || contains_folded(&post.excerpt, &needle)
            || post.tags.iter().any(|tag| contains_folded(tag, &needle));

        let matches_tag = match self.tag.as_deref().filter(|tag| !tag.is_empty()) {
            Some(tag) => post.tags.iter().any(|candidate| candidate == tag),
            None => true,
        };

        matches_search && matches_tag
    }
}

/// Keep the posts matching `filter`, in their original order.
pub fn filter_posts(posts: Vec<BlogPost>, filter: &PostFilter) -> Vec<BlogPost> {
    posts.into_iter().filter(|post| filter.matches(post)).collect()
}

/// A filtered listing with its first entry singled out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeaturedListing {
    /// First post of the listing, rendered prominently.
    pub featured: Option<BlogPost>,
    /// Everything after the featured post.
    pub posts: Vec<BlogPost>,
}

/// Split off the first post as the featured one.
pub fn split_featured(posts: Vec<BlogPost>) -> FeaturedListing {
    let mut posts = posts.into_iter();
    let featured = posts.next();
    FeaturedListing {
        featured,
        posts: posts.collect(),
    }
}

/// A tag and the number of posts carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    /// Tag text.
    pub name: String,
    /// Posts containing the tag.
    pub count: usize,
}

/// Distinct tags across `posts`, sorted by name, with per-tag post counts.
pub fn aggregate_tags(posts: &[BlogPost]) -> Vec<TagInfo> {
    let mut tag_counts: HashMap<&str, usize> = HashMap::new();
    for post in posts {
        let mut seen: Vec<&str> = Vec::with_capacity(post.tags.len());
        for tag in &post.tags {
            // A tag repeated inside one post still counts that post once.
            if seen.contains(&tag.as_str()) {
                continue;
            }
            seen.push(tag);
            *tag_counts.entry(tag).or_insert(0) += 1;
        }
    }

    let mut tags: Vec<TagInfo> = tag_counts
        .into_iter()
        .map(|(name, count)| TagInfo {
            name: name.to_string(),
            count,
        })
        .collect();
    tags.sort_by(|a, b| a.name.cmp(&b.name));
    tags
}

/// Parse an admin status dropdown value. `all`, blank or absent mean "any".
pub fn parse_status_filter<T>(raw: Option<&str>) -> Result<Option<T>, UnknownStatus>
where
    T: FromStr<Err = UnknownStatus>,
{
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}

/// Admin post list filter: title/excerpt search plus status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminPostFilter {
    /// Free-text query.
    pub q: String,
    /// Restrict to one status.
    pub status: Option<PostStatus>,
}

impl AdminPostFilter {
    /// Whether `post` passes the filter.
    pub fn matches(&self, post: &BlogPost) -> bool {
        let needle = self.q.to_lowercase();
        let matches_search =
            contains_folded(&post.title, &needle) || contains_folded(&post.excerpt, &needle);
        matches_search && self.status.is_none_or(|status| post.status == status)
    }
}

/// Admin subscriber list filter: email/name search plus status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberFilter {
    /// Free-text query.
    pub q: String,
    /// Restrict to one status.
    pub status: Option<SubscriberStatus>,
}

impl SubscriberFilter {
    /// Whether `subscriber` passes the filter.
    pub fn matches(&self, subscriber: &Subscriber) -> bool {
        let needle = self.q.to_lowercase();
        let matches_search = contains_folded(&subscriber.email, &needle)
            || subscriber
                .name
                .as_deref()
                .is_some_and(|name| contains_folded(name, &needle));
        matches_search && self.status.is_none_or(|status| subscriber.status == status)
    }
}

/// Admin suggestion list filter: subject/message/name/email search plus
/// status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionFilter {
    /// Free-text query.
    pub q: String,
    /// Restrict to one status.
    pub status: Option<SuggestionStatus>,
}

impl SuggestionFilter {
    /// Whether `suggestion` passes the filter.
    pub fn matches(&self, suggestion: &ContentSuggestion) -> bool {
        let needle = self.q.to_lowercase();
        let matches_search = contains_folded(&suggestion.subject, &needle)
            || contains_folded(&suggestion.message, &needle)
            || contains_folded(&suggestion.name, &needle)
            || contains_folded(&suggestion.email, &needle);
        matches_search && self.status.is_none_or(|status| suggestion.status == status)
    }
}

/// Per-status subscriber counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberCounts {
    /// All subscribers.
    pub total: usize,
    /// Status `active`.
    pub active: usize,
    /// Status `unsubscribed`.
    pub unsubscribed: usize,
}

impl SubscriberCounts {
    /// Count `subscribers` by status.
    pub fn tally(subscribers: &[Subscriber]) -> Self {
        subscribers.iter().fold(Self::default(), |mut counts, subscriber| {
            counts.total += 1;
            match subscriber.status {
                SubscriberStatus::Active => counts.active += 1,
                SubscriberStatus::Unsubscribed => counts.unsubscribed += 1,
            }
            counts
        })
    }
}

/// Per-status suggestion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionCounts {
    /// All suggestions.
    pub total: usize,
    /// Status `pending`.
    pub pending: usize,
    /// Status `reviewed`.
    pub reviewed: usize,
    /// Status `implemented`.
    pub implemented: usize,
}

impl SuggestionCounts {
    /// Count `suggestions` by status.
    pub fn tally(suggestions: &[ContentSuggestion]) -> Self {
        suggestions.iter().fold(Self::default(), |mut counts, suggestion| {
            counts.total += 1;
            match suggestion.status {
                SuggestionStatus::Pending => counts.pending += 1,
                SuggestionStatus::Reviewed => counts.reviewed += 1,
                SuggestionStatus::Implemented => counts.implemented += 1,
            }
            counts
        })
    }
}

/// `needle` must already be lower-cased.
fn contains_folded(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn post(title: &str, excerpt: &str, tags: &[&str]) -> BlogPost {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().expect("valid date");
        BlogPost {
            id: format!("id-{title}"),
            title: title.to_string(),
            slug: crate::content::generate_slug(title),
            excerpt: excerpt.to_string(),
            content: String::new(),
            thumbnail_url: None,
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            status: PostStatus::Published,
            author: "Admin".to_string(),
            created_at: at,
            updated_at: at,
            published_at: Some(at),
            read_time: 1,
            views: 0,
        }
    }

    fn titles(posts: &[BlogPost]) -> Vec<&str> {
        posts.iter().map(|post| post.title.as_str()).collect()
    }

    #[test]
    fn tag_filter_is_exact_and_case_sensitive() {
        let posts = vec![
            post("Yield farming", "", &["DeFi"]),
            post("Lowercase", "", &["defi"]),
            post("Art drops", "", &["NFT"]),
        ];
        let filter = PostFilter {
            q: String::new(),
            tag: Some("DeFi".to_string()),
        };
        assert_eq!(titles(&filter_posts(posts, &filter)), vec!["Yield farming"]);
    }

    #[test]
    fn query_matching_only_a_tag_keeps_the_post() {
        let posts = vec![post("Weekly notes", "Things we read", &["Staking"]), post("Other", "", &[])];
        let filter = PostFilter {
            q: "stak".to_string(),
            tag: None,
        };
        assert_eq!(titles(&filter_posts(posts, &filter)), vec!["Weekly notes"]);
    }

    #[test]
    fn query_searches_title_and_excerpt_case_insensitively() {
        let posts = vec![
            post("Bitcoin Basics", "", &[]),
            post("Intro", "Why BITCOIN matters", &[]),
            post("Unrelated", "Nothing here", &[]),
        ];
        let filter = PostFilter {
            q: "bitcoin".to_string(),
            tag: None,
        };
        assert_eq!(titles(&filter_posts(posts, &filter)), vec!["Bitcoin Basics", "Intro"]);
    }

    #[test]
    fn query_and_tag_must_both_match() {
        let posts = vec![
            post("DeFi risks", "", &["DeFi"]),
            post("DeFi art", "", &["NFT"]),
        ];
        let filter = PostFilter {
            q: "defi".to_string(),
            tag: Some("NFT".to_string()),
        };
        assert_eq!(titles(&filter_posts(posts, &filter)), vec!["DeFi art"]);
    }

    #[test]
    fn empty_filter_keeps_everything_in_order() {
        let posts = vec![post("b", "", &[]), post("a", "", &[]), post("c", "", &[])];
        let filter = PostFilter {
            q: String::new(),
            tag: Some(String::new()),
        };
        assert_eq!(titles(&filter_posts(posts, &filter)), vec!["b", "a", "c"]);
    }

    #[test]
    fn split_featured_takes_first_post() {
        let listing = split_featured(vec![post("first", "", &[]), post("second", "", &[])]);
        assert_eq!(listing.featured.map(|post| post.title), Some("first".to_string()));
        assert_eq!(titles(&listing.posts), vec!["second"]);

        let empty = split_featured(Vec::new());
        assert!(empty.featured.is_none());
        assert!(empty.posts.is_empty());
    }

    #[test]
    fn tags_are_aggregated_alphabetically_with_counts() {
        let posts = vec![post("one", "", &["a", "b"]), post("two", "", &["b"])];
        assert_eq!(
            aggregate_tags(&posts),
            vec![
                TagInfo {
                    name: "a".to_string(),
                    count: 1
                },
                TagInfo {
                    name: "b".to_string(),
                    count: 2
                },
            ]
        );
    }

    #[test]
    fn duplicate_tag_within_a_post_counts_once() {
        let posts = vec![post("one", "", &["b", "b"]), post("two", "", &["B"])];
        let tags = aggregate_tags(&posts);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "B");
        assert_eq!(tags[1].count, 1);
    }

    #[test]
    fn status_filter_accepts_all_and_blank() {
        assert_eq!(parse_status_filter::<PostStatus>(None), Ok(None));
        assert_eq!(parse_status_filter::<PostStatus>(Some("all")), Ok(None));
        assert_eq!(parse_status_filter::<PostStatus>(Some(" ")), Ok(None));
        assert_eq!(
            parse_status_filter::<PostStatus>(Some("draft")),
            Ok(Some(PostStatus::Draft))
        );
        assert!(parse_status_filter::<SuggestionStatus>(Some("archived")).is_err());
    }

    #[test]
    fn admin_post_filter_ignores_tags() {
        let mut draft = post("Draft idea", "", &["secret"]);
        draft.status = PostStatus::Draft;
        let filter = AdminPostFilter {
            q: "secret".to_string(),
            status: None,
        };
        assert!(!filter.matches(&draft));

        let filter = AdminPostFilter {
            q: "idea".to_string(),
            status: Some(PostStatus::Draft),
        };
        assert!(filter.matches(&draft));
        assert!(!filter.matches(&post("An idea", "", &[])));
    }

    #[test]
    fn subscriber_filter_searches_email_and_name() {
        let at = Utc::now();
        let subscriber = Subscriber {
            id: "s1".to_string(),
            email: "reader@example.com".to_string(),
            name: Some("Grace".to_string()),
            subscribed_at: at,
            status: SubscriberStatus::Unsubscribed,
        };
        let by_name = SubscriberFilter {
            q: "GRA".to_string(),
            status: None,
        };
        assert!(by_name.matches(&subscriber));
        let active_only = SubscriberFilter {
            q: "reader".to_string(),
            status: Some(SubscriberStatus::Active),
        };
        assert!(!active_only.matches(&subscriber));

        let counts = SubscriberCounts::tally(std::slice::from_ref(&subscriber));
        assert_eq!(counts.total, 1);
        assert_eq!(counts.unsubscribed, 1);
        assert_eq!(counts.active, 0);
    }

    #[test]
    fn suggestion_counts_by_status() {
        let at = Utc::now();
        let make = |status| ContentSuggestion {
            id: "x".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            subject: "Layer 2".to_string(),
            message: "Please cover rollups".to_string(),
            status,
            created_at: at,
        };
        let suggestions = vec![
            make(SuggestionStatus::Pending),
            make(SuggestionStatus::Pending),
            make(SuggestionStatus::Implemented),
        ];
        let counts = SuggestionCounts::tally(&suggestions);
        assert_eq!(
            counts,
            SuggestionCounts {
                total: 3,
                pending: 2,
                reviewed: 0,
                implemented: 1,
            }
        );

        let filter = SuggestionFilter {
            q: "rollups".to_string(),
            status: Some(SuggestionStatus::Pending),
        };
        assert_eq!(suggestions.iter().filter(|s| filter.matches(s)).count(), 2);
    }
}
