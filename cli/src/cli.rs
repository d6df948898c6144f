use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Draft,
    Published,
    All,
}

#[derive(Parser)]
#[command(name = "capryos-cli", version, about = "Capryos content admin CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the SQLite schema.
    Init {
        /// SQLite database path.
        #[arg(long, default_value = "./data/capryos.db")]
        db_path: PathBuf,
    },
    /// Write a Markdown post into the database.
    WritePost {
        /// SQLite database path.
        #[arg(long, default_value = "./data/capryos.db")]
        db_path: PathBuf,
        /// Markdown file path.
        #[arg(long)]
        file: PathBuf,
        /// Update this post instead of creating a new one.
        #[arg(long)]
        id: Option<String>,
        /// Publish instead of saving as draft.
        #[arg(long)]
        publish: bool,
        /// Comma-separated tags (overrides frontmatter).
        #[arg(long)]
        tags: Option<String>,
        /// Author name (overrides frontmatter).
        #[arg(long)]
        author: Option<String>,
    },
    /// List posts, newest first.
    ListPosts {
        /// SQLite database path.
        #[arg(long, default_value = "./data/capryos.db")]
        db_path: PathBuf,
        /// Status filter.
        #[arg(long, value_enum, default_value_t = StatusArg::All)]
        status: StatusArg,
        /// Search title and excerpt.
        #[arg(long, default_value = "")]
        q: String,
    },
    /// Show tags of published posts with their counts.
    Tags {
        /// SQLite database path.
        #[arg(long, default_value = "./data/capryos.db")]
        db_path: PathBuf,
    },
    /// Show dashboard counters.
    Stats {
        /// SQLite database path.
        #[arg(long, default_value = "./data/capryos.db")]
        db_path: PathBuf,
    },
}
