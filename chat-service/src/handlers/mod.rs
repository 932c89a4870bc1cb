//! HTTP handlers for the chat service.
//!
//! Every handler validates its input, makes one delegated call and wraps the
//! outcome in the `{success, ...}` envelope. Failures become `AppError`.

pub mod app;
pub mod auth;
pub mod chat;
pub mod diagnostics;
pub mod generation;
pub mod records;

use axum::Json;
use axum_extra::extract::WithRejection;
use service_core::error::AppError;

use crate::services::StoreError;

/// JSON body whose parse failures render as the standard 400 envelope.
pub type ApiJson<T> = WithRejection<Json<T>, AppError>;

/// A required text field: absent and empty are both rejected.
pub(crate) fn required(value: Option<String>, message: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(message.to_string()))
}

/// Map a data-store failure, treating a missing row as 404.
pub(crate) fn store_error(err: StoreError, context: &str, not_found: &str) -> AppError {
    match err {
        StoreError::NotFound => AppError::NotFound(not_found.to_string()),
        other => AppError::upstream(context, other),
    }
}
