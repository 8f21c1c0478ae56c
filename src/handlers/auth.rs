use crate::{
    auth::{AuthRouterExt, AuthUser},
    entities::{user, ActivityAction, Role},
    errors::ServiceError,
    handlers::common::{created_response, success_response, ApiJson, MessageResponse},
    middleware_helpers::ClientInfo,
    services::activity_log::LogDetails,
    AppState,
};
use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

/// Signup request payload
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
#[schema(example = json!({
    "name": "Sam Line",
    "email": "sam@bistro.test",
    "password": "walk-in-cooler"
}))]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request payload
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of an account
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[schema(value_type = String, example = "user")]
    pub role: Role,
}

impl From<&user::Model> for UserSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

impl From<&AuthUser> for UserSummary {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.user_id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyResponse {
    pub success: bool,
    pub user: UserSummary,
}

/// Auth routes, mounted under `/api/auth`
pub fn auth_routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/verify", get(verify))
        .route("/logout", post(logout))
        .with_auth();

    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .merge(protected)
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Missing fields or email taken", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    client: ClientInfo,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state
        .services
        .users
        .signup(&payload.name, &payload.email, &payload.password)
        .await?;
    let token = state.auth.generate_token(&account)?;

    let actor = AuthUser::from(&account).actor();
    state
        .services
        .activity
        .record(
            &actor,
            ActivityAction::UserCreated,
            LogDetails::default()
                .changes(json!({ "email": account.email, "role": account.role }))
                .client(client.ip_address, client.user_agent),
        )
        .await;

    Ok(created_response(TokenResponse {
        success: true,
        message: "User created successfully".to_string(),
        token,
        user: UserSummary::from(&account),
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Invalid email or password", body = crate::errors::ErrorResponse),
        (status = 403, description = "Account deactivated", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let account = state
        .services
        .users
        .login(&payload.email, &payload.password)
        .await?;
    let token = state.auth.generate_token(&account)?;

    state
        .services
        .activity
        .record(
            &AuthUser::from(&account).actor(),
            ActivityAction::Login,
            LogDetails::default().client(client.ip_address, client.user_agent),
        )
        .await;

    Ok(success_response(TokenResponse {
        success: true,
        message: "Login successful".to_string(),
        token,
        user: UserSummary::from(&account),
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/verify",
    responses(
        (status = 200, description = "Token is valid", body = VerifyResponse),
        (status = 401, description = "Missing, invalid or expired token", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn verify(user: AuthUser) -> impl IntoResponse {
    success_response(VerifyResponse {
        success: true,
        user: UserSummary::from(&user),
    })
}

/// Tokens are stateless; logging out is recorded but the token stays valid
/// until it expires.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse)),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
) -> impl IntoResponse {
    state
        .services
        .activity
        .record(
            &user.actor(),
            ActivityAction::Logout,
            LogDetails::default().client(client.ip_address, client.user_agent),
        )
        .await;

    info!(user_id = %user.user_id, "user logged out");
    success_response(MessageResponse::new("Logged out successfully"))
}
