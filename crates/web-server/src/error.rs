use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use core_types::ValidationError;
use database::DbError;
use reporter::ReportError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Event store error: {0}")]
    Database(#[from] DbError),
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

// Extractor rejections are malformed input like any other and share its 400 response.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(ValidationError::new("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(ValidationError::new("params", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(ValidationError::new("path", rejection.body_text()))
    }
}

impl AppError {
    /// The HTTP status, a stable machine-readable kind and the client-facing message.
    fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "validation", e.to_string()),
            AppError::Database(e) | AppError::Report(ReportError::Store(e)) => classify_store(e),
        }
    }
}

fn classify_store(err: &DbError) -> (StatusCode, &'static str, String) {
    match err {
        DbError::Validation(e) => (StatusCode::BAD_REQUEST, "validation", e.to_string()),
        DbError::StoreUnavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "store_unavailable",
            "Service degraded: the event store is unavailable".to_string(),
        ),
        DbError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
        DbError::AlreadyResolved(_) => (StatusCode::CONFLICT, "already_resolved", err.to_string()),
        DbError::Duplicate(_) => (StatusCode::CONFLICT, "duplicate", err.to_string()),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "An internal database error occurred".to_string(),
        ),
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.classify();
        if status.is_server_error() {
            tracing::error!(error = ?self, kind, "Request failed.");
        } else {
            tracing::debug!(error = %self, kind, "Request rejected.");
        }

        let body = Json(json!({ "error": message, "kind": kind }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (AppError::from(ValidationError::new("days", "must be at least 1")), StatusCode::BAD_REQUEST),
            (AppError::from(DbError::StoreUnavailable("timeout".into())), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::from(DbError::NotFound("sig".into())), StatusCode::NOT_FOUND),
            (AppError::from(DbError::AlreadyResolved("sig".into())), StatusCode::CONFLICT),
            (AppError::from(DbError::Duplicate("sig".into())), StatusCode::CONFLICT),
            (AppError::from(DbError::CorruptRow("bad".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (
                AppError::from(ReportError::Store(DbError::StoreUnavailable("down".into()))),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let (_, kind, message) = AppError::from(DbError::CorruptRow("row 7: bad source".into())).classify();
        assert_eq!(kind, "internal");
        assert!(!message.contains("row 7"));
    }
}
