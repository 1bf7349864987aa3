use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::DbErr;
use thiserror::Error;
use todos::TodoError;

use crate::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Todo(#[from] TodoError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Todo(err) => match err {
                TodoError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
                TodoError::InvalidOrder(_) => (StatusCode::BAD_REQUEST, "InvalidOrder"),
                TodoError::TodoNotFound(_) | TodoError::UserNotFound(_) => {
                    (StatusCode::NOT_FOUND, "NotFound")
                }
                TodoError::Forbidden(_) => (StatusCode::FORBIDDEN, "ForbiddenError"),
                TodoError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "StorageError"),
            },
            ApiError::Database(db_err) => match db_err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "ForbiddenError"),
        };

        let error_message = match &self {
            ApiError::Todo(TodoError::Database(_)) | ApiError::Database(_) => {
                "A storage error occurred. Please try again.".to_string()
            }
            ApiError::Todo(err) => err.to_string(),
            ApiError::Unauthorized => "Unauthorized".to_string(),
            ApiError::NotFound(msg) | ApiError::Forbidden(msg) => msg.clone(),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_maps_to_expected_http_statuses() {
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("nope".to_string())
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("missing".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Database(DbErr::Custom("boom".to_string()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn todo_errors_map_to_expected_http_statuses() {
        let cases = [
            (
                TodoError::Validation("missing".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                TodoError::InvalidOrder("out of range".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (TodoError::TodoNotFound(1), StatusCode::NOT_FOUND),
            (TodoError::UserNotFound(1), StatusCode::NOT_FOUND),
            (
                TodoError::Forbidden("copy".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (
                TodoError::Database(DbErr::Custom("disk".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
