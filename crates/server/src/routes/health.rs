use axum::response::Json as ResponseJson;

use crate::response::ApiResponse;

pub async fn health_check() -> ResponseJson<ApiResponse<String>> {
    ResponseJson(ApiResponse::success("OK".to_string()))
}
