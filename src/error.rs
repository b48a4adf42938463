//! Error types for the store and the HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised by [`crate::database::Store`]
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    /// The requested dates overlap an existing reservation
    #[error("dates already booked")]
    Conflict,
}

// redb splits its errors per operation; all of them fold into `redb::Error`.
macro_rules! impl_from_redb {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StoreError {
                fn from(err: $ty) -> Self {
                    StoreError::Database(err.into())
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Errors returned by HTTP handlers
///
/// Rendered as `{"error": <message>, "code": <code>}`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Local input problem detected before touching the store
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    PaymentDeclined(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Store failure; the message is generic, details go to the log
    #[error("{0}")]
    Store(String),
}

impl AppError {
    /// Converts a store failure into a client-facing error.
    ///
    /// Storage and encoding failures are logged and replaced by `generic`,
    /// without distinguishing their cause.
    pub fn from_store(err: StoreError, generic: &str) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            StoreError::AlreadyExists(what) => {
                AppError::Conflict(format!("{} already exists", what))
            }
            StoreError::Conflict => {
                AppError::Conflict("These dates are already booked.".to_string())
            }
            other => {
                tracing::error!(error = %other, "{}", generic);
                AppError::Store(generic.to_string())
            }
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::PaymentDeclined(_) => (StatusCode::PAYMENT_REQUIRED, "payment_declined"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        (
            status,
            Json(json!({
                "error": self.to_string(),
                "code": code,
            })),
        )
            .into_response()
    }
}
