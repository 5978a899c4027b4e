use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ServiceError;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}

/// Explicit caller identity and company scope, read from request headers.
/// Nothing in the core reads ambient session state; these two ids are
/// threaded into every manager call.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub company_id: Uuid,
    pub actor_id: Uuid,
}

fn header_uuid(parts: &Parts, name: &str) -> Result<Uuid, ServiceError> {
    let value = parts
        .headers
        .get(name)
        .ok_or_else(|| ServiceError::MissingRequiredField(format!("{} header", name)))?
        .to_str()
        .map_err(|_| ServiceError::ValidationError(format!("{} header is not valid", name)))?;
    Uuid::parse_str(value)
        .map_err(|_| ServiceError::ValidationError(format!("{} header is not a UUID", name)))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            company_id: header_uuid(parts, "x-company-id")?,
            actor_id: header_uuid(parts, "x-actor-id")?,
        })
    }
}
