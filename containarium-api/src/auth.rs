use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use containarium_core::ApiError;

use crate::error::ApiErrorResponse;
use crate::state::ApiState;

/// Bearer-token check shared by every REST route except `/healthz` (§4.H:
/// "REST is authenticated by bearer token").
pub async fn require_bearer_token(
    State(state): State<ApiState>,
    headers: HeaderMap,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiErrorResponse> {
    let token = bearer_token(&headers).ok_or_else(|| {
        ApiErrorResponse(ApiError::validation("missing or malformed Authorization header"))
    })?;
    state
        .jwt
        .validate(&token)
        .map_err(|e| ApiErrorResponse(ApiError::validation(e.to_string())))?;
    Ok(next.run(request).await)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}
