use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use capryos_shared::{
    memory_store::MemoryStore, site::Site, sqlite_store::SqliteStore, store::ContentStore,
};

use crate::{
    auth::SessionStore,
    config::{AppConfig, IN_MEMORY_DB},
};

const CONTACT_RELAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    pub site: Site,
    pub sessions: SessionStore,
    pub config: Arc<AppConfig>,
    /// Client for the contact relay.
    pub http: reqwest::Client,
}

impl AppState {
    /// Open the store named by `config.db_path` and build the state around it.
    pub fn open(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn ContentStore> = if config.db_path == IN_MEMORY_DB {
            tracing::warn!("using an in-memory store; content is lost on restart");
            Arc::new(MemoryStore::new())
        } else {
            if let Some(parent) = Path::new(&config.db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create database directory {}", parent.display())
                    })?;
                }
            }
            Arc::new(SqliteStore::open(&config.db_path)?)
        };
        Self::new(config, store)
    }

    pub fn new(config: AppConfig, store: Arc<dyn ContentStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(CONTACT_RELAY_TIMEOUT)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            site: Site::new(store),
            sessions: SessionStore::default(),
            config: Arc::new(config),
            http,
        })
    }
}
