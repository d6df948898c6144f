use std::{fs, path::Path};

use anyhow::{Context, Result};
use capryos_cli::utils::{build_draft, parse_markdown};
use capryos_shared::PostStatus;

use crate::db::open_site;

pub async fn run(
    db_path: &Path,
    file: &Path,
    id: Option<&str>,
    publish: bool,
    tags: Option<&str>,
    author: Option<String>,
) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("failed to read markdown file {}", file.display()))?;
    let (frontmatter, body) = parse_markdown(&content)?;
    if frontmatter.title.as_deref().is_none_or(|title| title.trim().is_empty()) {
        anyhow::bail!("frontmatter title is required");
    }

    let draft = build_draft(frontmatter, body, tags, author);
    let status = if publish {
        PostStatus::Published
    } else {
        PostStatus::Draft
    };

    let site = open_site(db_path)?;
    let post = site
        .save_post(id, draft, status)
        .await
        .context("failed to save post")?;

    tracing::info!(
        id = %post.id,
        slug = %post.slug,
        status = %post.status,
        read_time = post.read_time,
        tags = ?post.tags,
        "Wrote post `{}`",
        post.title
    );
    Ok(())
}
