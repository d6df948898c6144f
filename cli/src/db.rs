use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use capryos_shared::{site::Site, sqlite_store::SqliteStore};

pub fn open_store(db_path: &Path) -> Result<SqliteStore> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }
    }
    SqliteStore::open(db_path)
}

pub fn open_site(db_path: &Path) -> Result<Site> {
    Ok(Site::new(Arc::new(open_store(db_path)?)))
}
