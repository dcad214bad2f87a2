//! Axum middleware enforcing Basic Auth and API keys.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use super::credentials::Credentials;
use crate::routes::ApiError;

/// Header carrying the API key on public endpoints.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests without valid admin Basic Auth before they reach the
/// handler.
pub async fn require_basic_auth(
    State(credentials): State<Arc<Credentials>>,
    request: Request,
    next: Next,
) -> Response {
    let verdict = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        None => Err(ApiError::Unauthorized("Authorization required")),
        Some(header) if credentials.check_basic_auth(header) => Ok(()),
        Some(_) => Err(ApiError::Unauthorized("Invalid credentials")),
    };

    match verdict {
        Ok(()) => {
            debug!(path = %request.uri().path(), "Basic authentication successful");
            next.run(request).await
        }
        Err(err) => {
            warn!(path = %request.uri().path(), reason = %err, "Basic authentication rejected");
            err.into_response()
        }
    }
}

/// Reject requests without a known `X-API-Key`.
pub async fn require_api_key(
    State(credentials): State<Arc<Credentials>>,
    request: Request,
    next: Next,
) -> Response {
    let valid = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|key| credentials.check_api_key(key));

    if valid {
        next.run(request).await
    } else {
        warn!(path = %request.uri().path(), "Invalid or missing API key");
        ApiError::Forbidden("Invalid or missing API key").into_response()
    }
}
