use std::env;

use anyhow::{Context, Result};

pub const DEFAULT_DB_PATH: &str = "./data/capryos.db";
pub const IN_MEMORY_DB: &str = ":memory:";
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub bind_addr: String,
    /// SQLite file, or [`IN_MEMORY_DB`] for a throwaway store.
    pub db_path: String,
    pub admin_email: Option<String>,
    /// Lowercase hex SHA-256 of the admin password.
    pub admin_password_sha256: Option<String>,
    pub session_ttl: chrono::Duration,
    /// Form endpoint the contact page relays to.
    pub contact_endpoint: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let port = port
            .parse::<u16>()
            .with_context(|| format!("PORT must be a port number, got `{port}`"))?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
        let db_path = env::var("CAPRYOS_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

        let ttl_hours = env::var("CAPRYOS_SESSION_TTL_HOURS")
            .ok()
            .and_then(|value| value.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_SESSION_TTL_HOURS)
            .max(1);

        Ok(Self {
            port,
            bind_addr,
            db_path,
            admin_email: non_empty_var("CAPRYOS_ADMIN_EMAIL").map(|email| email.to_lowercase()),
            admin_password_sha256: non_empty_var("CAPRYOS_ADMIN_PASSWORD_SHA256")
                .map(|hash| hash.to_lowercase()),
            session_ttl: chrono::Duration::hours(ttl_hours),
            contact_endpoint: non_empty_var("CAPRYOS_CONTACT_ENDPOINT"),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Admin login is only possible when both credentials are configured.
    pub fn admin_enabled(&self) -> bool {
        self.admin_email.is_some() && self.admin_password_sha256.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bind_addr: "0.0.0.0".to_string(),
            db_path: IN_MEMORY_DB.to_string(),
            admin_email: None,
            admin_password_sha256: None,
            session_ttl: chrono::Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            contact_endpoint: None,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr_joins_host_and_port() {
        let config = AppConfig {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            ..AppConfig::default()
        };
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn admin_needs_both_credentials() {
        let mut config = AppConfig {
            admin_email: Some("admin@capryos.io".to_string()),
            ..AppConfig::default()
        };
        assert!(!config.admin_enabled());
        config.admin_password_sha256 = Some("00".repeat(32));
        assert!(config.admin_enabled());
    }
}
