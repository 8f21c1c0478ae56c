/*!
 * # Authentication and Authorization Module
 *
 * Bearer-token authentication for the inventory API:
 *
 * - HS256 JWTs issued at signup and login
 * - Per-request user reload, so role changes and deactivation apply at once
 * - Role gating for admin routes
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    entities::{user, Role},
    errors::ServiceError,
    services::activity_log::Actor,
};

pub mod password;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,   // Subject (user ID)
    pub name: String,  // User's name at issue time
    pub email: String, // User's email
    pub role: Role,    // Role at issue time; the database copy wins
    pub jti: String,   // JWT ID (unique identifier for this token)
    pub iat: i64,      // Issued at time
    pub exp: i64,      // Expiration time
    pub iss: String,   // Issuer
    pub aud: String,   // Audience
}

/// Authenticated user, as currently stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins pass every role check.
    pub fn has_role(&self, role: Role) -> bool {
        self.is_admin() || self.role == role
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

impl From<&user::Model> for AuthUser {
    fn from(user: &user::Model) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            token_expiration,
        }
    }

    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_audience.clone(),
            cfg.auth_issuer.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
        )
    }
}

/// Issues and checks tokens; resolves them to current users
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Signs a token for `user`
    pub fn generate_token(&self, user: &user::Model) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.token_expiration)
                .map_err(|_| AuthError::TokenCreation("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Resolves a bearer token to the user it names, as stored right now.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let user = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("User not found".into()))?;

        if !user.is_active {
            warn!(user_id = %user.id, "token presented for deactivated account");
            return Err(ServiceError::AccountDisabled(
                "Your account has been deactivated. Contact admin.".into(),
            ));
        }

        Ok(AuthUser::from(&user))
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ServiceError::Unauthorized("No token provided".into()),
            AuthError::InvalidToken => ServiceError::Unauthorized("Invalid token".into()),
            AuthError::TokenExpired => ServiceError::Unauthorized("Token has expired".into()),
            AuthError::TokenCreation(msg) => ServiceError::InternalError(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("Authentication required".into()))
    }
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".into()))?;

    if !user.has_role(required_role) {
        debug!(user_id = %user.user_id, required = %required_role, "role check failed");
        return Err(ServiceError::Forbidden(format!(
            "Access denied. {} privileges required.",
            capitalize(&required_role.as_string())
        )));
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates bearer tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return ServiceError::InternalError("Authentication service not available".into())
                .into_response();
        }
    };

    let token = match bearer_token(request.headers()) {
        Some(token) => token.to_string(),
        None => return AuthError::MissingToken.into_response(),
    };

    match auth_service.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: Role) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: Role) -> Self {
        self.layer(axum::middleware::from_fn_with_state(role, role_middleware))
            .with_auth()
    }
}
