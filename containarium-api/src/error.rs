use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use containarium_core::ApiError;
use serde::Serialize;

/// Wraps [`ApiError`] so this crate can implement `IntoResponse` for it
/// (the orphan rule blocks doing so directly on a foreign type).
pub struct ApiErrorResponse(pub ApiError);

impl From<ApiError> for ApiErrorResponse {
    fn from(err: ApiError) -> Self {
        ApiErrorResponse(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.tag().to_string(),
            message: self.0.message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Maps `ApiError`'s five kinds onto the gRPC status codes named in §7.
pub fn to_tonic_status(err: ApiError) -> tonic::Status {
    let code = match &err {
        ApiError::Validation(_) => tonic::Code::InvalidArgument,
        ApiError::NotFound(_) => tonic::Code::NotFound,
        ApiError::Conflict(_) => tonic::Code::AlreadyExists,
        ApiError::Transient(_) => tonic::Code::Unavailable,
        ApiError::Fatal(_) => tonic::Code::Internal,
    };
    tonic::Status::new(code, err.message().to_string())
}
