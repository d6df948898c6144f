use std::path::Path;

use anyhow::Result;
use capryos_cli::utils::format_post_rows;
use capryos_shared::{listing::AdminPostFilter, PostStatus};

use crate::{cli::StatusArg, db::open_site};

pub async fn run(db_path: &Path, status: StatusArg, q: String) -> Result<()> {
    let site = open_site(db_path)?;
    let filter = AdminPostFilter {
        q,
        status: match status {
            StatusArg::Draft => Some(PostStatus::Draft),
            StatusArg::Published => Some(PostStatus::Published),
            StatusArg::All => None,
        },
    };

    let posts = site.admin_posts(&filter).await?;
    if posts.is_empty() {
        tracing::info!("No posts found");
        return Ok(());
    }
    tracing::info!("{} post(s)\n{}", posts.len(), format_post_rows(&posts));
    Ok(())
}
