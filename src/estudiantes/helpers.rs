use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::{request::Parts, StatusCode},
    Extension, Json,
};

use crate::auth::ValidatedKey;
use crate::error::ApiError;
use crate::http::ErrorResponse;

pub(crate) type HandlerError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn map_error(err: ApiError) -> HandlerError {
    let status = match &err {
        ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
        ApiError::ValidationError { .. } | ApiError::ConfirmationRequired => {
            StatusCode::BAD_REQUEST
        }
        ApiError::StorageError(_) => StatusCode::SERVICE_UNAVAILABLE,
        ApiError::SerializationError(_) | ApiError::ConfigError(_) | ApiError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    }

    let body = ErrorResponse {
        error: err.to_string(),
        details: None,
    };

    (status, Json(body))
}

/// Label to attribute a write to; public routes carry no key.
pub(crate) fn caller_label(caller: &Option<Extension<ValidatedKey>>) -> &str {
    match caller {
        Some(Extension(key)) => key.label(),
        None => "public",
    }
}

/// `Json` body extractor whose rejection uses the API's error body.
pub(crate) struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(extractor_error(rejection.status(), rejection.body_text())),
        }
    }
}

/// `Path` extractor whose rejection uses the API's error body.
pub(crate) struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(extractor_error(rejection.status(), rejection.body_text())),
        }
    }
}

fn extractor_error(status: StatusCode, message: String) -> HandlerError {
    tracing::debug!(%status, "Request rejected by extractor: {}", message);
    let body = ErrorResponse {
        error: message,
        details: None,
    };
    (status, Json(body))
}
