use crate::errors::ServiceError;
use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// JSON request body. Malformed or mistyped bodies are rejected with the
/// API error envelope instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| {
                ServiceError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
            })
    }
}

/// Parses a path id; an unparseable id is reported like a missing record.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServiceError::not_found(what))
}

/// `{success, message}`
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// `{success, data}`
#[derive(Debug, Serialize, ToSchema)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `{success, message, data}`
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageDataResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> MessageDataResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// `{success, count, data}`
#[derive(Debug, Serialize, ToSchema)]
pub struct CountedResponse<T> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
}

impl<T> CountedResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

/// Standard pagination response metadata
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl PaginationMeta {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            total,
            page,
            limit,
            total_pages: total.div_ceil(limit.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_meta_rounds_pages_up() {
        let meta = PaginationMeta::new(1, 100, 0);
        assert_eq!(meta.total_pages, 0);
        let meta = PaginationMeta::new(2, 25, 51);
        assert_eq!(meta.total_pages, 3);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["totalPages"], 3);
    }

    #[test]
    fn bad_ids_read_as_not_found() {
        let err = parse_id("temp-ranch", "Item").unwrap_err();
        assert_eq!(err.to_string(), "Item not found");
        assert!(parse_id(&Uuid::new_v4().to_string(), "Item").is_ok());
    }
}
