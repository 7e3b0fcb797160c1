//! Axum extractors for API handlers

use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts},
    http::{header, request::Parts},
};
use pl_auth::{CookieConfig, MemorySessionStore, SessionStore};
use pl_core::config::AuthConfig;
use pl_core::Id;
use pl_db::Database;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::error::ApiError;

/// Upper bound on a configured session lifetime (one year)
const MAX_SESSION_MINUTES: u64 = 60 * 24 * 366;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions: Arc<dyn SessionStore>,
    pub cookie: CookieConfig,
    pub session_lifetime: chrono::Duration,
}

impl AppState {
    /// State backed by an in-memory session store
    pub fn new(db: Database, auth: &AuthConfig) -> Self {
        let minutes = auth.session_timeout_minutes.clamp(1, MAX_SESSION_MINUTES) as i64;
        Self {
            db,
            sessions: Arc::new(MemorySessionStore::new()),
            cookie: CookieConfig::new(auth.cookie_name.clone(), auth.cookie_secure, minutes * 60),
            session_lifetime: chrono::Duration::minutes(minutes),
        }
    }

    /// Connection pool handed to repositories
    pub fn pool(&self) -> SqlitePool {
        self.db.pool().clone()
    }
}

/// The user behind the request's session cookie
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Id,
    pub email: String,
    pub session_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let session = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|cookies| app_state.cookie.session_id_from(cookies))
            .and_then(|id| app_state.sessions.get(&id));

        match session {
            Some(session) => Ok(CurrentUser {
                id: session.user_id,
                email: session.email,
                session_id: session.id,
            }),
            None => Err(ApiError::unauthorized("Authentication required")),
        }
    }
}

/// JSON request body whose rejections render as [`ApiError`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Query string parameters whose rejections render as [`ApiError`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use pl_auth::Session;

    async fn state() -> AppState {
        let db = Database::in_memory().await.unwrap();
        AppState::new(
            db,
            &AuthConfig {
                session_timeout_minutes: 30,
                cookie_name: "pl_test".into(),
                cookie_secure: false,
            },
        )
    }

    fn parts(cookie: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/profile");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_missing_cookie_is_unauthorized() {
        let state = state().await;
        let err = CurrentUser::from_request_parts(&mut parts(None), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_unknown_session_is_unauthorized() {
        let state = state().await;
        let err = CurrentUser::from_request_parts(&mut parts(Some("pl_test=nope")), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_live_session_resolves_user() {
        let state = state().await;
        let session = Session::start(7, "a@x.com", state.session_lifetime);
        let id = session.id.clone();
        state.sessions.insert(session).unwrap();

        let cookie = format!("theme=dark; pl_test={}", id);
        let user = CurrentUser::from_request_parts(&mut parts(Some(&cookie)), &state)
            .await
            .unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.session_id, id);
    }

    #[tokio::test]
    async fn test_session_lifetime_is_clamped() {
        let db = Database::in_memory().await.unwrap();
        let state = AppState::new(
            db,
            &AuthConfig {
                session_timeout_minutes: 0,
                cookie_name: "c".into(),
                cookie_secure: true,
            },
        );
        assert_eq!(state.session_lifetime, chrono::Duration::minutes(1));
        assert_eq!(state.cookie.max_age, Some(60));
        assert!(state.cookie.secure);
    }
}
