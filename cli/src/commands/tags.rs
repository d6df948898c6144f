use std::path::Path;

use anyhow::Result;
use capryos_cli::utils::format_tags;

use crate::db::open_site;

pub async fn run(db_path: &Path) -> Result<()> {
    let tags = open_site(db_path)?.tags().await?;
    if tags.is_empty() {
        tracing::info!("No tags on published posts");
        return Ok(());
    }
    tracing::info!("{} tag(s)\n{}", tags.len(), format_tags(&tags));
    Ok(())
}
