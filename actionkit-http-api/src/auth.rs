use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::ActionApiState;

/// Bearer-token check on every route except `/health`.
pub async fn auth_middleware(
    State(state): State<Arc<ActionApiState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));

    match token {
        Some(token) if !state.api_token.is_empty() && token == state.api_token => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::debug!("rejected unauthenticated request to {}", request.uri().path());
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
