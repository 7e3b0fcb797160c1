//! Server-side sessions
//!
//! A login stores a [`Session`] under a random id and hands the id to the
//! client in a cookie. Every later request resolves the cookie back to the
//! session; a missing, unknown or expired session means "not logged in".

use chrono::{DateTime, Duration, Utc};
use pl_core::Id;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session store unavailable")]
    StoreUnavailable,
}

/// Session data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: Id,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub accessed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Start a session for a user who just logged in
    pub fn start(user_id: Id, email: impl Into<String>, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: generate_session_id(),
            user_id,
            email: email.into(),
            created_at: now,
            accessed_at: now,
            expires_at: now + lifetime,
        }
    }

    pub fn is_valid(&self) -> bool {
        Utc::now() < self.expires_at
    }

    pub fn touch(&mut self) {
        self.accessed_at = Utc::now();
    }
}

/// Generate a random 64-character alphanumeric session id
fn generate_session_id() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    const SESSION_ID_LENGTH: usize = 64;

    let mut rng = rand::rng();
    (0..SESSION_ID_LENGTH)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// Session store for different backends
pub trait SessionStore: Send + Sync {
    /// Look up a live session; expired sessions are never returned
    fn get(&self, session_id: &str) -> Option<Session>;

    fn insert(&self, session: Session) -> Result<(), SessionError>;

    fn remove(&self, session_id: &str) -> Result<(), SessionError>;

    /// Drop every session belonging to a user
    fn remove_user_sessions(&self, user_id: Id) -> Result<usize, SessionError>;

    fn purge_expired(&self) -> Result<usize, SessionError>;
}

/// In-memory session store
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn retain(&self, keep: impl Fn(&Session) -> bool) -> Result<usize, SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::StoreUnavailable)?;
        let before = sessions.len();
        sessions.retain(|_, s| keep(s));
        Ok(before - sessions.len())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session_id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().ok()?;
        let session = sessions.get_mut(session_id).filter(|s| s.is_valid())?;
        session.touch();
        Some(session.clone())
    }

    fn insert(&self, session: Session) -> Result<(), SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::StoreUnavailable)?;
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    fn remove(&self, session_id: &str) -> Result<(), SessionError> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| SessionError::StoreUnavailable)?;
        sessions.remove(session_id);
        Ok(())
    }

    fn remove_user_sessions(&self, user_id: Id) -> Result<usize, SessionError> {
        self.retain(|s| s.user_id != user_id)
    }

    fn purge_expired(&self) -> Result<usize, SessionError> {
        let removed = self.retain(Session::is_valid)?;
        if removed > 0 {
            tracing::debug!(removed, "Purged expired sessions");
        }
        Ok(removed)
    }
}

/// Cookie configuration for sessions
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub max_age: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "projectledger_session".to_string(),
            path: "/".to_string(),
            secure: false,
            http_only: true,
            same_site: SameSite::Lax,
            max_age: None,
        }
    }
}

impl CookieConfig {
    pub fn new(name: impl Into<String>, secure: bool, max_age_seconds: i64) -> Self {
        Self {
            name: name.into(),
            secure,
            max_age: Some(max_age_seconds),
            ..Default::default()
        }
    }

    /// `Set-Cookie` value carrying the session id
    pub fn build_cookie(&self, session_id: &str) -> String {
        let mut parts = vec![
            format!("{}={}", self.name, session_id),
            format!("Path={}", self.path),
        ];
        if self.secure {
            parts.push("Secure".to_string());
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        parts.push(format!("SameSite={}", self.same_site.as_str()));
        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={}", max_age));
        }
        parts.join("; ")
    }

    /// `Set-Cookie` value that expires the session cookie
    pub fn build_clear_cookie(&self) -> String {
        format!("{}=; Path={}; Max-Age=0; HttpOnly", self.name, self.path)
    }

    /// Pull the session id out of a `Cookie` request header
    pub fn session_id_from(&self, cookie_header: &str) -> Option<String> {
        extract_session_id(cookie_header, &self.name)
    }
}

/// Extract a session id from a cookie header
pub fn extract_session_id(cookie_header: &str, cookie_name: &str) -> Option<String> {
    cookie_header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_start() {
        let session = Session::start(1, "a@x.com", Duration::hours(1));
        assert!(session.is_valid());
        assert_eq!(session.user_id, 1);
        assert_eq!(session.email, "a@x.com");
        assert_eq!(session.id.len(), 64);
        assert!(session.id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_expired_session_is_not_returned() {
        let store = MemorySessionStore::new();
        let session = Session::start(1, "a@x.com", Duration::seconds(-1));
        let id = session.id.clone();
        store.insert(session).unwrap();

        assert!(store.get(&id).is_none());
        assert_eq!(store.purge_expired().unwrap(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_session_store() {
        let store = MemorySessionStore::new();
        let session = Session::start(7, "b@x.com", Duration::hours(1));
        let id = session.id.clone();
        store.insert(session).unwrap();

        assert_eq!(store.get(&id).map(|s| s.user_id), Some(7));

        store.remove(&id).unwrap();
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn test_remove_user_sessions() {
        let store = MemorySessionStore::new();
        store.insert(Session::start(1, "a@x.com", Duration::hours(1))).unwrap();
        store.insert(Session::start(1, "a@x.com", Duration::hours(1))).unwrap();
        store.insert(Session::start(2, "b@x.com", Duration::hours(1))).unwrap();

        assert_eq!(store.remove_user_sessions(1).unwrap(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_cookie_config() {
        let config = CookieConfig::new("pl_session", true, 3600);
        let cookie = config.build_cookie("abc123");

        assert!(cookie.starts_with("pl_session=abc123; Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.ends_with("Max-Age=3600"));
        assert!(config.build_clear_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_extract_session_id() {
        let cookie = "theme=dark; projectledger_session=abc123; other=value";
        assert_eq!(
            extract_session_id(cookie, "projectledger_session"),
            Some("abc123".to_string())
        );
        assert_eq!(extract_session_id(cookie, "missing"), None);
        assert_eq!(extract_session_id("projectledger_session=", "projectledger_session"), None);
    }
}
