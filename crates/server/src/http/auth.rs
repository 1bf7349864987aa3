use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    middleware::Next,
};

use crate::{AppState, error::ApiError, response::ApiResponse};

const USER_ID_HEADER: &str = "x-user-id";
const API_TOKEN_HEADER: &str = "x-api-token";

/// The authenticated caller, inserted as a request extension by [`require_api_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i64);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0
    }
}

fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let (prefix, rest) = trimmed.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn extract_user_id(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn extract_request_token(headers: &HeaderMap) -> Option<String> {
    // 1) Authorization: Bearer <secret>
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer)
    {
        return Some(value.to_string());
    }

    // 2) X-API-Token: <secret>
    headers
        .get(API_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn unauthorized(req: &Request, reason: &'static str) -> Response {
    tracing::warn!(
        path = %req.uri().path(),
        method = %req.method(),
        reason,
        "Unauthorized API request"
    );
    let response = ApiResponse::<()>::error("Unauthorized");
    (StatusCode::UNAUTHORIZED, Json(response)).into_response()
}

pub async fn require_api_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(user_id) = extract_user_id(req.headers()) else {
        return unauthorized(&req, "missing_user_id");
    };
    let Some(secret) = extract_request_token(req.headers()) else {
        return unauthorized(&req, "missing_token");
    };

    match state.todos.authenticate(user_id, &secret).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(CurrentUser(user.id));
            next.run(req).await
        }
        Ok(None) => unauthorized(&req, "invalid_credentials"),
        Err(err) => ApiError::from(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_parsing() {
        assert_eq!(parse_authorization_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_authorization_bearer("bearer   abc  "), Some("abc"));
        assert_eq!(parse_authorization_bearer("Basic abc"), None);
        assert_eq!(parse_authorization_bearer("Bearer "), None);
    }

    #[test]
    fn token_prefers_authorization_header() {
        let mut headers = HeaderMap::new();
        headers.insert(API_TOKEN_HEADER, HeaderValue::from_static("from-x-api"));
        assert_eq!(extract_request_token(&headers).as_deref(), Some("from-x-api"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-bearer"));
        assert_eq!(
            extract_request_token(&headers).as_deref(),
            Some("from-bearer")
        );
    }

    #[test]
    fn user_id_must_be_numeric() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_user_id(&headers), None);
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("abc"));
        assert_eq!(extract_user_id(&headers), None);
        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" 42 "));
        assert_eq!(extract_user_id(&headers), Some(42));
    }
}
