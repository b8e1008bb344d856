use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::service::ServiceError;

/// Error returned by the JSON API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] JsonRejection),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidJson(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            ApiError::Service(ServiceError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, (*msg).to_owned())
            }
            ApiError::Service(ServiceError::NotFound) => {
                (StatusCode::NOT_FOUND, "short URL not found".to_owned())
            }
            ApiError::Service(ServiceError::StoreUnavailable(e)) => {
                tracing::error!(error = %e, "Link store request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "link store unavailable".to_owned(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
