#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use inventory_tracker::{app_router, config::AppConfig, db, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "kitchen-walkin-cooler-secret-for-integration-tests-only-9f3c1e7a2b";

/// Helper harness for spinning up the application backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

/// A signed-up account and its bearer token.
pub struct Session {
    pub token: String,
    pub user: Value,
}

impl Session {
    pub fn id(&self) -> String {
        self.user["id"].as_str().unwrap_or_default().to_string()
    }
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        // One long-lived connection; every new in-memory connection is a new database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.db_idle_timeout_secs = 3600;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        let router = app_router(state.clone());

        Self { router, state }
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("user-agent", "inventory-tests/1.0")
            .header("x-forwarded-for", "203.0.113.9");

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a raw JSON-typed body, for payloads `serde_json` cannot produce.
    pub async fn call_raw(
        &self,
        method: Method,
        uri: &str,
        body: &'static str,
        token: &str,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::from(body))
            .expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");
        let status = response.status();
        (status, response_json(response).await)
    }

    /// Sends a request and decodes the JSON body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, token).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    /// Signs up an account; the first one in a fresh app is the admin.
    pub async fn signup(&self, name: &str, email: &str) -> Session {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/signup",
                Some(json!({ "name": name, "email": email, "password": "walk-in-cooler" })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");
        Session {
            token: body["token"].as_str().expect("token").to_string(),
            user: body["user"].clone(),
        }
    }

    /// Creates an item and returns its id.
    pub async fn create_item(&self, token: &str, item: Value) -> String {
        let (status, body) = self
            .call(Method::POST, "/api/items", Some(item), Some(token))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["data"]["id"].as_str().expect("item id").to_string()
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
}

/// A minimal valid item body.
pub fn wings(quantity: f64) -> Value {
    json!({
        "name": "Chicken Wings",
        "quantity": quantity,
        "unit": "case",
        "minStock": 10,
        "supplier": "Sysco",
        "category": "Freezer",
        "location": "Walk-in Freezer",
        "costPerUnit": 42.5,
        "isNightly": true
    })
}
