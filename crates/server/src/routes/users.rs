use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use todos::Todo;

use crate::{AppState, error::ApiError, response::ApiResponse};

pub async fn list_user_todos(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Vec<Todo>>>, ApiError> {
    let todos = state.todos.list_by_user(user_id).await?;
    Ok(ResponseJson(ApiResponse::success(todos)))
}

pub async fn list_user_shared_todos(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Vec<Todo>>>, ApiError> {
    let todos = state.todos.list_shared_by_user(user_id).await?;
    Ok(ResponseJson(ApiResponse::success(todos)))
}

pub fn router() -> Router<AppState> {
    let inner = Router::new()
        .route("/todos", get(list_user_todos))
        .route("/todos/shared", get(list_user_shared_todos));

    Router::new().nest("/users/{user_id}", inner)
}
