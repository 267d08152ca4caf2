use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Failures reported by a `TableStore`. Callers inspect these; nothing panics across the
/// store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record for `{0}` must be a JSON object")]
    NotAnObject(&'static str),

    #[error("record for `{0}` has no writable fields")]
    EmptyRecord(&'static str),

    #[error("invalid column name `{0}`")]
    InvalidColumn(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failures reported by an `AuthProvider`.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The auth service refused the request; the message is shown to the user verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("auth service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("access token rejected: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("auth service unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    /// Message suitable for the login form.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Rejected(msg) => msg.clone(),
            _ => "Failed to login".to_string(),
        }
    }
}

/// A form field failed the manager's field schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("{label} is required")]
    Required { field: &'static str, label: &'static str },
}

/// Why a manager mutation did not go through.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no {label} with id {id}")]
    Missing { label: &'static str, id: i64 },

    #[error("{0} entries cannot be edited")]
    ReadOnly(&'static str),
}

/// Request-level failures that abort a handler.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error("not found")]
    NotFound,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Editor(EditorError::Form(_)) => (StatusCode::BAD_REQUEST, "INVALID_FORM"),
            AppError::Editor(EditorError::ReadOnly(_)) => {
                (StatusCode::METHOD_NOT_ALLOWED, "READ_ONLY")
            }
            AppError::Editor(EditorError::Missing { .. }) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Template(_) | AppError::Store(_) | AppError::Editor(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "An internal server error occurred.".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ApiErrorBody { code, message })).into_response()
    }
}
