//! Admin sessions and the bearer-token middleware guarding `/api/admin`.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::{config::AppConfig, error::ApiError, state::AppState};

#[derive(Debug, Clone)]
pub struct AdminSession {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Issued admin tokens. Expired entries are dropped lazily.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, AdminSession>>>,
}

impl SessionStore {
    pub fn issue(&self, email: &str, ttl: Duration) -> AdminSession {
        let session = AdminSession {
            token: uuid::Uuid::new_v4().simple().to_string(),
            email: email.to_string(),
            expires_at: Utc::now() + ttl,
        };
        let mut sessions = self.sessions.write();
        let now = Utc::now();
        sessions.retain(|_, existing| existing.expires_at > now);
        sessions.insert(session.token.clone(), session.clone());
        session
    }

    pub fn validate(&self, token: &str) -> Option<AdminSession> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read();
            match sessions.get(token) {
                Some(session) if session.expires_at > now => return Some(session.clone()),
                Some(_) => {},
                None => return None,
            }
        }
        self.sessions.write().remove(token);
        None
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.write().remove(token).is_some()
    }
}

/// Check a login attempt against the configured admin account.
pub fn verify_credentials(config: &AppConfig, email: &str, password: &str) -> bool {
    let (Some(expected_email), Some(expected_hash)) =
        (&config.admin_email, &config.admin_password_sha256)
    else {
        return false;
    };
    let email_ok = email.trim().to_lowercase() == *expected_email;
    let hash = hex::encode(Sha256::digest(password.as_bytes()));
    let hash_ok = constant_time_eq(hash.as_bytes(), expected_hash.as_bytes());
    email_ok && hash_ok
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Reject requests without a live admin session; on success the
/// [`AdminSession`] is available as a request extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(&request) else {
        tracing::debug!("missing or malformed authorization header");
        return Err(ApiError::Unauthorized);
    };

    let Some(session) = state.sessions.validate(token) else {
        tracing::debug!("unknown or expired admin session");
        return Err(ApiError::Unauthorized);
    };

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            admin_email: Some("admin@capryos.io".to_string()),
            admin_password_sha256: Some(hex::encode(Sha256::digest(b"hunter2"))),
            ..AppConfig::default()
        }
    }

    #[test]
    fn credentials_match_on_email_and_password_hash() {
        let config = config();
        assert!(verify_credentials(&config, " Admin@Capryos.io ", "hunter2"));
        assert!(!verify_credentials(&config, "admin@capryos.io", "hunter3"));
        assert!(!verify_credentials(&config, "other@capryos.io", "hunter2"));
        assert!(!verify_credentials(&AppConfig::default(), "admin@capryos.io", "hunter2"));
    }

    #[test]
    fn sessions_expire_and_can_be_revoked() {
        let store = SessionStore::default();
        let live = store.issue("admin@capryos.io", Duration::hours(1));
        assert_eq!(
            store.validate(&live.token).map(|session| session.email),
            Some("admin@capryos.io".to_string())
        );

        let stale = store.issue("admin@capryos.io", Duration::seconds(-1));
        assert!(store.validate(&stale.token).is_none());

        assert!(store.revoke(&live.token));
        assert!(store.validate(&live.token).is_none());
        assert!(!store.revoke(&live.token));
    }
}
