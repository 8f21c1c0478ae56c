use crate::{
    errors::ServiceError,
    handlers::common::{success_response, ApiJson, CountedResponse},
    services::{
        items::ItemView,
        nightly::{CountResult, CountSummary},
    },
    AppState,
};
use axum::{
    extract::State, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct EndOfDayResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<CountResult>,
    pub summary: CountSummary,
}

#[utoipa::path(
    get,
    path = "/api/items/nightly-list",
    responses((status = 200, description = "Active nightly items by category then name", body = CountedResponse<ItemView>)),
    security(("bearer_auth" = [])),
    tag = "nightly"
)]
pub async fn nightly_list(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let now = Utc::now();
    let items = state
        .services
        .nightly
        .nightly_list()
        .await?
        .into_iter()
        .map(|model| ItemView::new(model, now))
        .collect();

    Ok(success_response(CountedResponse::new(items)))
}

/// Applies the counted quantities. Each entry succeeds or fails on its own;
/// the request as a whole only fails when `counts` is empty or missing.
#[utoipa::path(
    post,
    path = "/api/items/end-of-day-count",
    request_body = Object,
    responses(
        (status = 200, description = "Per-item outcomes", body = EndOfDayResponse),
        (status = 400, description = "Invalid count data", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "nightly"
)]
pub async fn end_of_day_count(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<impl IntoResponse, ServiceError> {
    let counts = body.get("counts").unwrap_or(&Value::Null);
    let reconciliation = state.services.nightly.reconcile_counts(counts).await?;

    Ok(success_response(EndOfDayResponse {
        success: true,
        message: reconciliation.message(),
        results: reconciliation.results,
        summary: reconciliation.summary,
    }))
}
