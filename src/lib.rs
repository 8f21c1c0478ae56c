//! Inventory Tracker Library
//!
//! Restaurant inventory tracking: items with par levels and derived stock
//! status, the nightly count, end-of-day reconciliation, and an audited
//! admin surface behind JWT authentication.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;
pub mod validation;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use std::sync::Arc;

use crate::auth::{AuthConfig, AuthRouterExt, AuthService};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::entities::Role;
use crate::services::factory::ServiceContainer;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub services: ServiceContainer,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: AppConfig) -> Self {
        let auth = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&config),
            db.clone(),
        ));
        Self {
            services: ServiceContainer::new(db.clone()),
            db,
            config: Arc::new(config),
            auth,
        }
    }
}

/// Routes under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/items", handlers::items::item_routes().with_auth())
        .nest(
            "/admin",
            handlers::admin::admin_routes().with_role(Role::Admin),
        )
        .nest("/auth", handlers::auth::auth_routes())
}

/// The full application: API, health probes, Swagger UI and the shared
/// middleware stack. CORS and compression are left to the binary.
pub fn app_router(state: AppState) -> Router {
    let auth_service = state.auth.clone();
    let expose_error_details = state.config.is_development();
    let db = state.db.clone();

    Router::new()
        .nest("/api", api_routes())
        .with_state(state)
        .nest("/health", health::health_routes(db))
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(tracing::configure_http_tracing())
        // Inject AuthService into request extensions for auth middleware
        .layer(middleware::from_fn_with_state(
            auth_service,
            inject_auth_service,
        ))
        .layer(middleware::from_fn_with_state(
            expose_error_details,
            error_details_scope,
        ))
        // Ensure every request carries a request id for traceability
        .layer(middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}

async fn inject_auth_service(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(auth);
    next.run(request).await
}

async fn error_details_scope(State(expose): State<bool>, request: Request, next: Next) -> Response {
    errors::scope_error_details(expose, next.run(request)).await
}
