use axum::Json;
use axum::http::StatusCode;

use crate::models::ExtractionResult;

pub fn success(result: ExtractionResult) -> (StatusCode, Json<ExtractionResult>) {
    (StatusCode::OK, Json(result))
}

/// Failure body is always `{ok: false, error}`.
pub fn error(status: StatusCode, message: String) -> (StatusCode, Json<ExtractionResult>) {
    (status, Json(ExtractionResult::failure(message)))
}

/// Pick the status for a finished run.
pub fn from_result(result: ExtractionResult) -> (StatusCode, Json<ExtractionResult>) {
    if result.ok {
        success(result)
    } else {
        (StatusCode::BAD_GATEWAY, Json(result))
    }
}
