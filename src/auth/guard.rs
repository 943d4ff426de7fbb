use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::AuthConfig;
use crate::error::Result;
use crate::http::ErrorResponse;

use super::credentials::CredentialSet;
use super::validator::{RejectReason, ValidationOutcome};

pub const WWW_AUTHENTICATE_SCHEME: &str = "APIKey";

/// What the guard needs per request: the keys and the header to read them from.
#[derive(Clone, Debug)]
pub struct GuardState {
    credentials: Arc<CredentialSet>,
    header_name: HeaderName,
}

impl GuardState {
    pub fn new(credentials: Arc<CredentialSet>, cfg: &AuthConfig) -> Result<Self> {
        Ok(Self {
            credentials,
            header_name: cfg.header()?,
        })
    }
}

/// Middleware for protected routes.
///
/// On success the [`ValidatedKey`](super::ValidatedKey) is stored in the
/// request extensions for the handler; on failure the handler is never
/// called.
pub async fn require_api_key(
    State(guard): State<GuardState>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome = guard
        .credentials
        .validate_headers(request.headers(), &guard.header_name);

    match outcome {
        ValidationOutcome::Accepted(key) => {
            tracing::debug!(
                label = key.label(),
                path = %request.uri().path(),
                "API key accepted"
            );
            request.extensions_mut().insert(key);
            next.run(request).await
        }
        ValidationOutcome::Rejected(reason) => {
            tracing::warn!(
                %reason,
                method = %request.method(),
                path = %request.uri().path(),
                "API key rejected"
            );
            rejection(reason)
        }
    }
}

fn rejection(reason: RejectReason) -> Response {
    let body = ErrorResponse {
        error: "Unauthorized".to_string(),
        details: Some(json!({ "reason": reason })),
    };
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, WWW_AUTHENTICATE_SCHEME)],
        Json(body),
    )
        .into_response()
}
