use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::trace::TraceLayer;

use crate::{AppState, routes};

mod auth;

pub use auth::CurrentUser;

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::todos::router(&state))
        .merge(routes::users::router())
        .layer(from_fn_with_state(state.clone(), auth::require_api_auth));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
