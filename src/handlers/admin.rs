use crate::{
    auth::AuthUser,
    entities::{activity_log, user, ActivityAction, Role},
    errors::ServiceError,
    handlers::common::{
        parse_id, success_response, ApiJson, CountedResponse, DataResponse, MessageDataResponse,
        MessageResponse, PaginationMeta,
    },
    middleware_helpers::ClientInfo,
    services::{
        activity_log::{ActivityFilter, ActivityStats, LogDetails},
        users::{UserChanges, UserStats},
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Admin routes, mounted under `/api/admin`
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", put(update_user).delete(delete_user))
        .route("/activity-logs", get(list_activity_logs))
        .route("/stats", get(admin_stats))
}

/// Account as shown to admins; the password hash never leaves the store.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[schema(value_type = String, example = "user")]
    pub role: Role,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserView {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Update user request payload
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({ "role": "admin", "isActive": true }))]
pub struct UpdateUserRequest {
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ActivityLogQuery {
    pub user_id: Option<String>,
    /// One of the activity action names, e.g. `ITEM_UPDATED`
    pub action: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityLogResponse {
    pub success: bool,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<activity_log::Model>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminStats {
    pub users: UserStats,
    pub activity: ActivityStats,
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All users, newest first", body = CountedResponse<UserView>),
        (status = 403, description = "Admin privileges required", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let users = state.services.users.list().await?;
    Ok(success_response(CountedResponse::new(
        users.into_iter().map(UserView::from).collect(),
    )))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = MessageDataResponse<UserView>),
        (status = 400, description = "Invalid role or self-modification", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn update_user(
    State(state): State<AppState>,
    admin: AuthUser,
    client: ClientInfo,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id(&id, "User")?;
    let role = match payload.role.as_deref() {
        Some(raw) => Some(
            Role::parse(raw.trim()).ok_or_else(|| ServiceError::invalid_field("role", "Invalid role"))?,
        ),
        None => None,
    };

    let changes = UserChanges {
        role,
        is_active: payload.is_active,
    };
    let updated = state.services.users.update(admin.user_id, id, changes).await?;

    state
        .services
        .activity
        .record(
            &admin.actor(),
            ActivityAction::UserUpdated,
            LogDetails::default()
                .changes(json!({
                    "userId": updated.id,
                    "role": role,
                    "isActive": payload.is_active,
                }))
                .client(client.ip_address, client.user_agent),
        )
        .await;

    Ok(success_response(MessageDataResponse::new(
        "User updated successfully",
        UserView::from(updated),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Self-deletion", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AuthUser,
    client: ClientInfo,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id(&id, "User")?;
    let deleted = state.services.users.delete(admin.user_id, id).await?;

    state
        .services
        .activity
        .record(
            &admin.actor(),
            ActivityAction::UserDeleted,
            LogDetails::default()
                .changes(json!({ "deletedUser": deleted.email }))
                .client(client.ip_address, client.user_agent),
        )
        .await;

    Ok(success_response(MessageResponse::new(
        "User deleted successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/activity-logs",
    params(ActivityLogQuery),
    responses(
        (status = 200, description = "Activity entries, newest first", body = ActivityLogResponse),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_activity_logs(
    State(state): State<AppState>,
    Query(query): Query<ActivityLogQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let user_id = match query.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .map_err(|_| ServiceError::invalid_field("userId", "Invalid user id"))?,
        ),
        None => None,
    };
    let action = match query.action.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            ActivityAction::parse(raw)
                .ok_or_else(|| ServiceError::invalid_field("action", "Invalid action"))?,
        ),
        None => None,
    };

    let page = query.page.filter(|p| *p > 0).unwrap_or(1);
    let limit = state.config.page_size(query.limit);

    let (entries, total) = state
        .services
        .activity
        .query(ActivityFilter { user_id, action }, page, limit)
        .await?;

    Ok(success_response(ActivityLogResponse {
        success: true,
        data: entries,
        pagination: PaginationMeta::new(page, limit, total),
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses((status = 200, description = "User and activity statistics", body = DataResponse<AdminStats>)),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn admin_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let users = state.services.users.stats().await?;
    let activity = state.services.activity.stats().await?;
    Ok(success_response(DataResponse::new(AdminStats { users, activity })))
}
