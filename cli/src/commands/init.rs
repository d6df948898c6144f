use std::path::Path;

use anyhow::Result;
use capryos_shared::store::ContentStore;

use crate::db::open_store;

pub async fn run(db_path: &Path) -> Result<()> {
    let store = open_store(db_path)?;
    let stats = store.dashboard_stats().await?;
    tracing::info!(
        posts = stats.total_posts,
        subscribers = stats.total_subscribers,
        suggestions = stats.total_suggestions,
        "SQLite schema ready at {}",
        db_path.display()
    );
    Ok(())
}
