use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Every failure the review thread engine can report to a caller.
///
/// Validation and permission failures are computed before the store is
/// touched; a mutation that returns an error has written nothing.
#[derive(Debug, Error)]
pub enum ThreadError {
    /// A submitted field is missing or out of range.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The acting user is not allowed to perform this operation.
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),

    /// The reply would sit deeper than the maximum nesting level.
    #[error("reply depth limit reached")]
    MaxDepthExceeded,

    /// The author already has a top-level review for this product.
    #[error("a review for this product already exists for this author")]
    DuplicateReview,

    /// The record vanished between read and write, or never existed.
    #[error("review {0} not found")]
    NotFound(Uuid),

    /// Transport or database failure, surfaced unmasked.
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Wire-level discriminant of [`ThreadError`] so consumers branch on a kind
/// instead of matching message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    PermissionDenied,
    MaxDepthExceeded,
    DuplicateReview,
    NotFound,
    Storage,
}

impl ThreadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ThreadError::Validation(_) => ErrorKind::Validation,
            ThreadError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ThreadError::MaxDepthExceeded => ErrorKind::MaxDepthExceeded,
            ThreadError::DuplicateReview => ErrorKind::DuplicateReview,
            ThreadError::NotFound(_) => ErrorKind::NotFound,
            ThreadError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ThreadError::Validation(_) => StatusCode::BAD_REQUEST,
            ThreadError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ThreadError::MaxDepthExceeded => StatusCode::UNPROCESSABLE_ENTITY,
            ThreadError::DuplicateReview => StatusCode::CONFLICT,
            ThreadError::NotFound(_) => StatusCode::NOT_FOUND,
            ThreadError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
