//! Health checks
//!
//! `/health` pings the database and reports pool usage; `/health/live` only
//! proves the process is serving requests. Neither needs a session.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use pl_api::AppState;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseHealth {
    pub status: HealthStatus,
    pub response_time_ms: u64,
    pub pool_size: u32,
    pub idle_connections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub database: DatabaseHealth,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    pub fn http_status(&self) -> StatusCode {
        match self.status {
            HealthStatus::Healthy => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

async fn check_database(state: &AppState) -> DatabaseHealth {
    let start = Instant::now();
    let result = state.db.ping().await;
    let stats = state.db.stats();

    let (status, message) = match result {
        Ok(()) => (HealthStatus::Healthy, None),
        Err(e) => {
            warn!(error = %e, "Database health check failed");
            (HealthStatus::Unhealthy, Some(e.to_string()))
        }
    };

    DatabaseHealth {
        status,
        response_time_ms: start.elapsed().as_millis() as u64,
        pool_size: stats.size,
        idle_connections: stats.idle,
        message,
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let database = check_database(&state).await;
    let report = HealthReport {
        status: database.status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        timestamp: chrono::Utc::now(),
    };
    (report.http_status(), Json(report))
}

/// GET /health/live
pub async fn liveness() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl_core::config::AuthConfig;
    use pl_db::Database;

    fn auth() -> AuthConfig {
        AuthConfig {
            session_timeout_minutes: 60,
            cookie_name: "test_session".into(),
            cookie_secure: false,
        }
    }

    #[tokio::test]
    async fn test_health_reports_database() {
        let db = Database::in_memory().await.unwrap();
        let state = AppState::new(db, &auth());

        let (status, Json(report)) = health(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.database.pool_size, 1);
    }

    #[tokio::test]
    async fn test_closed_pool_is_unhealthy() {
        let db = Database::in_memory().await.unwrap();
        db.close().await;
        let state = AppState::new(db, &auth());

        let (status, Json(report)) = health(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(report.database.message.is_some());
    }
}
