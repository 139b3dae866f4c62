use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crudgen_engine::GenError;

/// GenError as an HTTP response:
///
/// ```json
/// {"code": "CONFLICT", "message": "...", "details": {...}}
/// ```
#[derive(Debug)]
pub struct ApiError(pub GenError);

impl From<GenError> for ApiError {
    fn from(e: GenError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            GenError::Validation(_) => StatusCode::BAD_REQUEST,
            GenError::Emission { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GenError::Conflict(_) => StatusCode::CONFLICT,
            GenError::Busy(_) => StatusCode::LOCKED,
            GenError::NotFound(_) => StatusCode::NOT_FOUND,
            GenError::Rollback(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GenError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = serde_json::json!({
            "code": self.0.error_code(),
            "message": self.0.to_string(),
        });
        if let Some(details) = self.0.details() {
            body["details"] = details;
        }
        if status.is_server_error() {
            tracing::error!(code = self.0.error_code(), error = %self.0, "request failed");
        }
        (status, axum::Json(body)).into_response()
    }
}
