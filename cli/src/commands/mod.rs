pub mod init;
pub mod list_posts;
pub mod stats;
pub mod tags;
pub mod write_post;

use anyhow::Result;

use crate::cli::{Cli, Commands};

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { db_path } => init::run(&db_path).await,
        Commands::WritePost {
            db_path,
            file,
            id,
            publish,
            tags,
            author,
        } => write_post::run(&db_path, &file, id.as_deref(), publish, tags.as_deref(), author).await,
        Commands::ListPosts { db_path, status, q } => list_posts::run(&db_path, status, q).await,
        Commands::Tags { db_path } => tags::run(&db_path).await,
        Commands::Stats { db_path } => stats::run(&db_path).await,
    }
}
