//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

use sift_core::{Error, RetrievalError};

/// Error returned by handlers, rendered as `{"error": ..., "kind": ...}`.
#[derive(Debug)]
pub enum ApiError {
    Search(Error),
    /// Body could not be parsed into a request
    BadRequest(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Search(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Search(Error::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Search(Error::Retrieval(RetrievalError::BothPathsFailed { .. })) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Search(Error::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Search(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "validation_error",
            ApiError::Search(err) => err.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = match self {
            ApiError::Search(err) => err.to_string(),
            ApiError::BadRequest(msg) => msg,
        };

        if status.is_server_error() {
            error!(subsystem = "api", status = status.as_u16(), kind, error = %message, "Request failed");
        } else {
            warn!(subsystem = "api", status = status.as_u16(), kind, error = %message, "Request rejected");
        }

        let body = Json(serde_json::json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::{RetrievalPath, ValidationError};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(Error::Validation(ValidationError::EmptyQuery)), 400),
            (
                ApiError::from(Error::Retrieval(RetrievalError::BothPathsFailed {
                    bm25: "down".into(),
                    vector: "down".into(),
                })),
                503,
            ),
            (ApiError::from(Error::Timeout(5000)), 504),
            (ApiError::from(Error::Internal("boom".into())), 500),
            (
                ApiError::from(Error::Retrieval(RetrievalError::path_failed(
                    RetrievalPath::Bm25,
                    "down",
                ))),
                500,
            ),
            (ApiError::BadRequest("bad json".into()), 400),
        ];
        for (err, status) in cases {
            assert_eq!(err.status().as_u16(), status, "{err:?}");
        }
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ApiError::from(Error::Timeout(1)).kind(), "timeout");
        assert_eq!(ApiError::BadRequest(String::new()).kind(), "validation_error");
    }
}
