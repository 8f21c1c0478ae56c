use crate::{
    auth::AuthUser,
    entities::{ActivityAction, Category, Supplier},
    errors::ServiceError,
    handlers::common::{
        created_response, parse_id, success_response, ApiJson, CountedResponse, DataResponse,
        MessageDataResponse, MessageResponse,
    },
    middleware_helpers::ClientInfo,
    services::{
        activity_log::LogDetails,
        items::{BulkUpdateResult, InventoryStats, ItemFilter, ItemView, SortSpec},
        stock_status::StockStatus,
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

/// Item routes, mounted under `/api/items`
pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/stats", get(inventory_stats))
        .route("/alerts/low-stock", get(low_stock_items))
        .route("/alerts/expiring-soon", get(expiring_soon_items))
        .route("/bulk-update", post(bulk_update_items))
        .route(
            "/nightly-list",
            get(crate::handlers::nightly::nightly_list),
        )
        .route(
            "/end-of-day-count",
            post(crate::handlers::nightly::end_of_day_count),
        )
        .route(
            "/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ItemListQuery {
    /// Exact category
    pub category: Option<String>,
    /// Exact supplier
    pub supplier: Option<String>,
    /// Case-insensitive substring of the name
    pub search: Option<String>,
    /// critical, low or stable
    pub status: Option<String>,
    /// name, quantity, status, value or createdAt; prefix `-` for descending
    pub sort: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Admins only
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExpiringQuery {
    /// Look-ahead window in days
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemListResponse {
    pub success: bool,
    pub count: usize,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
    pub data: Vec<ItemView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkSummary {
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkUpdateResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<BulkUpdateResult>,
    pub summary: BulkSummary,
}

fn parse_filter<T>(raw: Option<&str>, field: &str, message: &str) -> Result<Option<T>, ServiceError>
where
    T: FromStr,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ServiceError::invalid_field(field, message)),
    }
}

fn build_filter(state: &AppState, user: &AuthUser, query: ItemListQuery) -> Result<ItemFilter, ServiceError> {
    let category = match query.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            Category::parse(raw)
                .ok_or_else(|| ServiceError::invalid_field("category", "Invalid category"))?,
        ),
        None => None,
    };
    let supplier = match query.supplier.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            Supplier::parse(raw)
                .ok_or_else(|| ServiceError::invalid_field("supplier", "Invalid supplier"))?,
        ),
        None => None,
    };
    let status: Option<StockStatus> =
        parse_filter(query.status.as_deref(), "status", "Invalid status")?;
    let sort: Option<SortSpec> = parse_filter(query.sort.as_deref(), "sort", "Invalid sort field")?;

    Ok(ItemFilter {
        category,
        supplier,
        search: query.search,
        status,
        sort: sort.unwrap_or_default(),
        page: query.page.filter(|p| *p > 0).unwrap_or(1),
        limit: state.config.page_size(query.limit),
        include_inactive: user.is_admin() && query.include_inactive.unwrap_or(false),
    })
}

#[utoipa::path(
    get,
    path = "/api/items",
    params(ItemListQuery),
    responses(
        (status = 200, description = "Items matching the filters", body = ItemListResponse),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ItemListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let filter = build_filter(&state, &user, query)?;
    let page = state.services.items.list(filter).await?;

    Ok(success_response(ItemListResponse {
        success: true,
        count: page.items.len(),
        total: page.total,
        page: page.page,
        pages: page.pages,
        data: page.items,
    }))
}

#[utoipa::path(
    get,
    path = "/api/items/{id}",
    params(("id" = String, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item", body = DataResponse<ItemView>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id(&id, "Item")?;
    let item = state.services.items.get(id).await?;
    Ok(success_response(DataResponse::new(ItemView::from(item))))
}

#[utoipa::path(
    post,
    path = "/api/items",
    request_body = Object,
    responses(
        (status = 201, description = "Item created", body = MessageDataResponse<ItemView>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    ApiJson(payload): ApiJson<Value>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.items.create(&payload).await?;

    state
        .services
        .activity
        .record(
            &user.actor(),
            ActivityAction::ItemCreated,
            LogDetails::item(item.id, item.name.clone())
                .changes(json!({ "item": payload }))
                .client(client.ip_address, client.user_agent),
        )
        .await;

    Ok(created_response(MessageDataResponse::new(
        "Item created successfully",
        ItemView::from(item),
    )))
}

#[utoipa::path(
    put,
    path = "/api/items/{id}",
    params(("id" = String, Path, description = "Item id")),
    request_body = Object,
    responses(
        (status = 200, description = "Item updated", body = MessageDataResponse<ItemView>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id(&id, "Item")?;
    let (item, diff) = state.services.items.update(id, &payload).await?;

    state
        .services
        .activity
        .record(
            &user.actor(),
            ActivityAction::ItemUpdated,
            LogDetails::item(item.id, item.name.clone())
                .changes(diff)
                .client(client.ip_address, client.user_agent),
        )
        .await;

    Ok(success_response(MessageDataResponse::new(
        "Item updated successfully",
        ItemView::from(item),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    params(("id" = String, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item soft-deleted", body = MessageResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id(&id, "Item")?;
    let snapshot = state.services.items.soft_delete(id).await?;

    state
        .services
        .activity
        .record(
            &user.actor(),
            ActivityAction::ItemDeleted,
            LogDetails::item(snapshot.id, snapshot.name.clone())
                .changes(json!({ "deletedItem": snapshot }))
                .client(client.ip_address, client.user_agent),
        )
        .await;

    Ok(success_response(MessageResponse::new(
        "Item deleted successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/items/alerts/low-stock",
    responses((status = 200, description = "Low and critical items", body = CountedResponse<ItemView>)),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn low_stock_items(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let items = state.services.items.low_stock().await?;
    Ok(success_response(CountedResponse::new(views(items))))
}

#[utoipa::path(
    get,
    path = "/api/items/alerts/expiring-soon",
    params(ExpiringQuery),
    responses((status = 200, description = "Items expiring within the window", body = CountedResponse<ItemView>)),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn expiring_soon_items(
    State(state): State<AppState>,
    Query(query): Query<ExpiringQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let days = query
        .days
        .filter(|d| (1..=365).contains(d))
        .unwrap_or(state.config.expiring_soon_default_days);
    let items = state.services.items.expiring_soon(days).await?;
    Ok(success_response(CountedResponse::new(views(items))))
}

#[utoipa::path(
    get,
    path = "/api/items/stats",
    responses((status = 200, description = "Inventory statistics", body = DataResponse<InventoryStats>)),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn inventory_stats(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let stats = state.services.items.stats().await?;
    Ok(success_response(DataResponse::new(stats)))
}

#[utoipa::path(
    post,
    path = "/api/items/bulk-update",
    request_body = Object,
    responses(
        (status = 200, description = "Per-item outcomes", body = BulkUpdateResponse),
        (status = 400, description = "Empty or malformed batch", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn bulk_update_items(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> Result<impl IntoResponse, ServiceError> {
    let updates = body.get("updates").unwrap_or(&Value::Null);
    let results = state.services.items.bulk_update(updates).await?;

    let successful = results.iter().filter(|r| r.success).count();
    let failed = results.len() - successful;

    Ok(success_response(BulkUpdateResponse {
        success: true,
        message: format!(
            "Bulk update completed: {} successful, {} failed",
            successful, failed
        ),
        results,
        summary: BulkSummary { successful, failed },
    }))
}

fn views(items: Vec<crate::entities::item::Model>) -> Vec<ItemView> {
    let now = Utc::now();
    items
        .into_iter()
        .map(|model| ItemView::new(model, now))
        .collect()
}
