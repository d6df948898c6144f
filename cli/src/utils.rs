//! Markdown import and terminal formatting.

use anyhow::Result;
use capryos_shared::{listing::TagInfo, site::PostDraft, BlogPost};
use gray_matter::{engine::YAML, Matter};
use serde::Deserialize;

/// YAML frontmatter accepted by `write-post`.
#[derive(Debug, Default, Deserialize)]
pub struct Frontmatter {
    /// Post title.
    pub title: Option<String>,
    /// Teaser shown on cards.
    pub excerpt: Option<String>,
    /// Tag list.
    pub tags: Option<Vec<String>>,
    /// Author display name.
    pub author: Option<String>,
    /// Cover image URL.
    pub thumbnail_url: Option<String>,
}

/// Split a markdown document into its frontmatter and body.
pub fn parse_markdown(content: &str) -> Result<(Frontmatter, String)> {
    let matter = Matter::<YAML>::new();
    let parsed = matter.parse(content);

    let frontmatter = parsed
        .data
        .map(|data| data.deserialize::<Frontmatter>())
        .transpose()?
        .unwrap_or_default();

    Ok((frontmatter, parsed.content))
}

/// Split a comma-separated tag list, dropping blanks.
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(|tag| tag.to_string())
        .collect()
}

/// Build an editor draft from a parsed document. Command-line `tags` and
/// `author` win over the frontmatter.
pub fn build_draft(
    frontmatter: Frontmatter,
    body: String,
    tags: Option<&str>,
    author: Option<String>,
) -> PostDraft {
    PostDraft {
        title: frontmatter.title.unwrap_or_default(),
        excerpt: frontmatter.excerpt.unwrap_or_default(),
        content: body,
        thumbnail_url: frontmatter.thumbnail_url,
        tags: match tags {
            Some(tags) => parse_tags(tags),
            None => frontmatter.tags.unwrap_or_default(),
        },
        author: author.or(frontmatter.author),
    }
}

/// One aligned line per post: status, views, slug and title.
pub fn format_post_rows(posts: &[BlogPost]) -> String {
    let slug_width = posts
        .iter()
        .map(|post| post.slug.len())
        .max()
        .unwrap_or(0)
        .max("SLUG".len());

    let mut out = format!("{:<10} {:>6}  {:<slug_width$}  TITLE\n", "STATUS", "VIEWS", "SLUG");
    for post in posts {
        out.push_str(&format!(
            "{:<10} {:>6}  {:<slug_width$}  {}\n",
            post.status.as_str(),
            post.views,
            post.slug,
            post.title
        ));
    }
    out
}

/// `name (count)` per tag, one per line.
pub fn format_tags(tags: &[TagInfo]) -> String {
    tags.iter()
        .map(|tag| format!("{} ({})", tag.name, tag.count))
        .collect::<Vec<_>>()
        .join("\n")
}
