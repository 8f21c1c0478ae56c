use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

tokio::task_local! {
    static EXPOSE_ERROR_DETAILS: bool;
}

/// Runs `future` with internal error details either exposed in response
/// bodies (development) or hidden (everything else).
pub async fn scope_error_details<Fut, R>(expose: bool, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    EXPOSE_ERROR_DETAILS.scope(expose, future).await
}

fn error_details_exposed() -> bool {
    EXPOSE_ERROR_DETAILS.try_with(|flag| *flag).unwrap_or(false)
}

/// One invalid field in a submitted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "quantity")]
    pub field: String,
    #[schema(example = "Quantity must be a positive number")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "success": false,
    "error": "Not Found",
    "message": "Item not found",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    pub success: bool,
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "Item not found")]
    pub message: String,
    /// Per-field validation failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    /// Internal error text, development mode only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    #[schema(example = "2024-12-09T10:30:00.000Z")]
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("{0}")]
    NotFound(String),

    #[error("Validation failed")]
    ValidationError(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    AccountDisabled(String),

    #[error("{0}")]
    SelfModification(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn not_found(what: &str) -> Self {
        ServiceError::NotFound(format!("{} not found", what))
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::ValidationError(vec![FieldError::new(field, message)])
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::BadRequest(_)
            | Self::SelfModification(_)
            | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::AccountDisabled(_) => StatusCode::FORBIDDEN,
            Self::DatabaseError(_)
            | Self::InternalError(_)
            | Self::HashError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::HashError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Short machine-friendly kind, used for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database",
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::AccountDisabled(_) => "account_disabled",
            Self::SelfModification(_) => "self_modification",
            Self::Conflict(_) => "conflict",
            Self::InternalError(_) => "internal",
            Self::HashError(_) => "hash",
            Self::Other(_) => "other",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_internal() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        }

        let details = if self.is_internal() && error_details_exposed() {
            Some(self.to_string())
        } else {
            None
        };

        let errors = match &self {
            Self::ValidationError(fields) => Some(fields.clone()),
            _ => None,
        };

        let err = ErrorResponse {
            success: false,
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            errors,
            details,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};

    async fn payload(response: Response) -> ErrorResponse {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::not_found("Item").into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let payload = payload(response).await;
        assert!(!payload.success);
        assert_eq!(payload.message, "Item not found");
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
    }

    #[tokio::test]
    async fn validation_error_lists_every_field() {
        let response = ServiceError::ValidationError(vec![
            FieldError::new("name", "Item name is required"),
            FieldError::new("unit", "Invalid unit"),
        ])
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let payload = payload(response).await;
        let fields: Vec<_> = payload
            .errors
            .unwrap()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(fields, vec!["name", "unit"]);
    }

    #[tokio::test]
    async fn internal_details_only_exposed_when_scoped() {
        let hidden = payload(ServiceError::InternalError("disk on fire".into()).into_response()).await;
        assert_eq!(hidden.message, "Internal server error");
        assert!(hidden.details.is_none());

        let shown = scope_error_details(true, async {
            ServiceError::InternalError("disk on fire".into()).into_response()
        })
        .await;
        let shown = payload(shown).await;
        assert_eq!(shown.message, "Internal server error");
        assert!(shown.details.unwrap().contains("disk on fire"));
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::AccountDisabled("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::SelfModification("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::HashError("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn service_error_response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::HashError("sensitive".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::DatabaseError(sea_orm::DbErr::Custom("boom".into())).response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::SelfModification("You cannot delete your own account".into())
                .response_message(),
            "You cannot delete your own account"
        );
    }
}
