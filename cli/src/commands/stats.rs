use std::path::Path;

use anyhow::Result;

use crate::db::open_site;

pub async fn run(db_path: &Path) -> Result<()> {
    let snapshot = open_site(db_path)?.dashboard().await?;
    let stats = snapshot.stats;
    tracing::info!(
        "posts: {}, subscribers: {}, views: {}, suggestions: {}",
        stats.total_posts,
        stats.total_subscribers,
        stats.total_views,
        stats.total_suggestions
    );
    for post in &snapshot.popular_posts {
        tracing::info!("popular: {} ({} views)", post.slug, post.views);
    }
    Ok(())
}
