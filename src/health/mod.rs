/*!
 * # Health Check Module
 *
 * - Liveness (`/health`): the process is up and serving requests
 * - Readiness (`/health/ready`): the database answers a ping
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::db::{check_connection, DbPool};

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReadinessInfo {
    pub ready: bool,
    pub database: HealthStatus,
    pub timestamp: DateTime<Utc>,
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    pub db_pool: Arc<DbPool>,
    pub start_time: SystemTime,
}

impl HealthState {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db_pool,
            start_time: SystemTime::now(),
        }
    }

    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
    }
}

pub async fn health_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    debug!("Health check endpoint called");

    Json(HealthInfo {
        status: HealthStatus::Up,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.uptime(),
    })
}

/// 503 while the database is unreachable
pub async fn readiness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let database = match check_connection(&state.db_pool).await {
        Ok(()) => HealthStatus::Up,
        Err(e) => {
            warn!(error = %e, "readiness check failed");
            HealthStatus::Down
        }
    };

    let status_code = match database {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        status_code,
        Json(ReadinessInfo {
            ready: database == HealthStatus::Up,
            database,
            timestamp: Utc::now(),
        }),
    )
}

/// Health routes, mounted under `/health`
pub fn health_routes(db_pool: Arc<DbPool>) -> Router {
    let health_state = Arc::new(HealthState::new(db_pool));

    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .with_state(health_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use sea_orm::DatabaseConnection;
    use tower::ServiceExt;

    #[tokio::test]
    async fn liveness_does_not_touch_the_database() {
        let app = health_routes(Arc::new(DatabaseConnection::Disconnected));
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_fails_without_a_database() {
        let app = health_routes(Arc::new(DatabaseConnection::Disconnected));
        let response = app
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
