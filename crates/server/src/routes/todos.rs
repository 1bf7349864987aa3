use axum::{
    Extension, Json, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, patch, post},
};
use serde::Deserialize;
use todos::{CreateTodo, Todo, UpdateTodo};

use crate::{
    AppState, error::ApiError, http::CurrentUser, middleware::load_todo_middleware,
    response::ApiResponse,
};

#[derive(Debug, Deserialize)]
pub struct SetCompletedRequest {
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct ShareTodoRequest {
    pub user_id: i64,
}

fn ensure_owner(current_user: CurrentUser, todo: &Todo) -> Result<(), ApiError> {
    if todo.user_id == current_user.id() {
        return Ok(());
    }
    tracing::warn!(
        todo_id = todo.id,
        owner_id = todo.user_id,
        caller_id = current_user.id(),
        "Rejected change to another user's todo"
    );
    Err(ApiError::Forbidden(format!(
        "Todo {} belongs to another user",
        todo.id
    )))
}

pub async fn create_todo(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Json(payload): Json<CreateTodo>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Todo>>), ApiError> {
    // A missing user_id is reported by validation along with the other fields.
    if payload.user_id > 0 && payload.user_id != current_user.id() {
        return Err(ApiError::Forbidden(
            "Todos can only be created for yourself".to_string(),
        ));
    }
    let todo = state.todos.create(payload).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::success(todo))))
}

pub async fn get_todo(
    Extension(todo): Extension<Todo>,
) -> Result<ResponseJson<ApiResponse<Todo>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(todo)))
}

pub async fn update_todo(
    Extension(current_user): Extension<CurrentUser>,
    Extension(existing): Extension<Todo>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateTodo>,
) -> Result<ResponseJson<ApiResponse<Todo>>, ApiError> {
    ensure_owner(current_user, &existing)?;
    let todo = state.todos.update(existing.id, payload).await?;
    Ok(ResponseJson(ApiResponse::success(todo)))
}

pub async fn delete_todo(
    Extension(current_user): Extension<CurrentUser>,
    Extension(existing): Extension<Todo>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Todo>>, ApiError> {
    ensure_owner(current_user, &existing)?;
    let removed = state.todos.delete(existing.id).await?;
    Ok(ResponseJson(ApiResponse::success(removed)))
}

pub async fn set_todo_completed(
    Extension(current_user): Extension<CurrentUser>,
    Extension(existing): Extension<Todo>,
    State(state): State<AppState>,
    Json(payload): Json<SetCompletedRequest>,
) -> Result<ResponseJson<ApiResponse<Todo>>, ApiError> {
    ensure_owner(current_user, &existing)?;
    let todo = state
        .todos
        .set_completed(existing.id, payload.completed)
        .await?;
    Ok(ResponseJson(ApiResponse::success(todo)))
}

pub async fn share_todo(
    Extension(current_user): Extension<CurrentUser>,
    Extension(existing): Extension<Todo>,
    State(state): State<AppState>,
    Json(payload): Json<ShareTodoRequest>,
) -> Result<ResponseJson<ApiResponse<Todo>>, ApiError> {
    ensure_owner(current_user, &existing)?;
    let copy = state.todos.share(existing.id, payload.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(copy)))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let todo_router = Router::new()
        .route("/", get(get_todo).patch(update_todo).delete(delete_todo))
        .route("/complete", patch(set_todo_completed))
        .route("/share", post(share_todo))
        .layer(from_fn_with_state(
            state.clone(),
            load_todo_middleware::<AppState>,
        ));

    let inner = Router::new()
        .route("/", post(create_todo))
        .nest("/{todo_id}", todo_router);

    Router::new().nest("/todos", inner)
}
