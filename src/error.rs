use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Errors a handler can return; each maps to one status and a `{"error": ...}` body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    /// The public message goes to the client, the cause only to the log.
    #[error("{public}")]
    Internal {
        public: &'static str,
        cause: anyhow::Error,
    },
}

impl ApiError {
    pub fn internal(public: &'static str, cause: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            public,
            cause: cause.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::DuplicateEmail => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal { public, cause } = &self {
            error!(error = ?cause, "{public}");
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
