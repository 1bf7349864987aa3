use std::{fmt::Display, future::Future};

use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use db::{DBService, models::todo::Todo};

use crate::{AppState, error::ApiError};

pub trait ModelLoaderDeps {
    fn db_service(&self) -> &DBService;
}

impl ModelLoaderDeps for AppState {
    fn db_service(&self) -> &DBService {
        self.db()
    }
}

async fn fetch_model_or_status<M, E, Fut>(
    model_name: &'static str,
    model_id: i64,
    load_future: Fut,
) -> Result<M, ApiError>
where
    E: Display + Into<ApiError>,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    match load_future.await {
        Ok(Some(model)) => Ok(model),
        Ok(None) => {
            tracing::warn!("{model_name} {model_id} not found");
            Err(ApiError::NotFound(format!("{model_name} not found: {model_id}")))
        }
        Err(error) => {
            tracing::error!("Failed to fetch {model_name} {model_id}: {error}");
            Err(error.into())
        }
    }
}

async fn load_request_extension<M, E, Fut>(
    mut request: Request,
    next: Next,
    model_name: &'static str,
    model_id: i64,
    load_future: Fut,
) -> Result<Response, ApiError>
where
    M: Clone + Send + Sync + 'static,
    E: Display + Into<ApiError>,
    Fut: Future<Output = Result<Option<M>, E>>,
{
    let model = fetch_model_or_status(model_name, model_id, load_future).await?;
    request.extensions_mut().insert(model);
    Ok(next.run(request).await)
}

pub async fn load_todo_middleware<S>(
    State(state): State<S>,
    Path(todo_id): Path<i64>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    S: ModelLoaderDeps,
{
    load_request_extension(
        request,
        next,
        "Todo",
        todo_id,
        Todo::find_by_id(&state.db_service().pool, todo_id),
    )
    .await
}
