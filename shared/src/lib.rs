//! Domain types and the data-access layer shared by the Capryos backend and
//! CLI.
//!
//! The crate is organized bottom-up:
//! - [`models`]: rows persisted for posts, subscribers and content suggestions.
//! - [`content`]: derived values (slug, read time) and form normalization.
//! - [`listing`]: in-memory search, filters and tag aggregation.
//! - [`store`]: the [`store::ContentStore`] repository trait and its change
//!   feed, implemented by [`memory_store`] and [`sqlite_store`].
//! - [`site`]: the page-level operations built on top of a store.
//! - [`live`]: fetch-then-refetch-on-change views used by the admin console.

pub mod content;
pub mod listing;
pub mod live;
pub mod memory_store;
pub mod models;
pub mod site;
pub mod sqlite_store;
pub mod store;

pub use models::{
    BlogPost, ChangeKind, ContentSuggestion, DashboardSnapshot, DashboardStats, PostStatus,
    Subscriber, SubscriberStatus, SuggestionStatus, Table, TableChange, UnknownStatus,
};
