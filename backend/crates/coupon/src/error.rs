//! Coupon Error Types
//!
//! Coupon-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

pub type CouponResult<T> = Result<T, CouponError>;

/// Coupon-specific error variants
///
/// `NotFound` and `Ineligible` are business outcomes and reach the caller
/// verbatim. `Database` and `Internal` are unexpected: they are logged with
/// detail and replaced by a generic message before leaving the service.
#[derive(Debug, Error)]
pub enum CouponError {
    /// No coupon with the requested code
    #[error("Coupon not found")]
    NotFound,

    /// One of the four usage limits is exhausted
    #[error("Coupon usage limit exceeded")]
    Ineligible,

    /// Request failed validation
    #[error("{0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CouponError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CouponError::NotFound => StatusCode::NOT_FOUND,
            CouponError::Ineligible | CouponError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CouponError::Database(_) | CouponError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CouponError::NotFound => ErrorKind::NotFound,
            CouponError::Ineligible | CouponError::InvalidInput(_) => ErrorKind::BadRequest,
            CouponError::Database(_) | CouponError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// True for failures the caller should only ever see as a fallback message
    pub fn is_unexpected(&self) -> bool {
        matches!(self, CouponError::Database(_) | CouponError::Internal(_))
    }

    /// Convert to `AppError`, hiding unexpected detail behind `fallback`
    pub fn to_app_error(&self, fallback: &str) -> AppError {
        if self.is_unexpected() {
            AppError::new(self.kind(), fallback.to_owned())
        } else {
            AppError::new(self.kind(), self.to_string())
        }
    }

    /// Log with a level matching severity
    pub(crate) fn log(&self) {
        match self {
            CouponError::Database(e) => {
                tracing::error!(error = %e, "Coupon database error");
            }
            CouponError::Internal(msg) => {
                tracing::error!(message = %msg, "Coupon internal error");
            }
            CouponError::InvalidInput(msg) => {
                tracing::debug!(reason = %msg, "Rejected coupon request");
            }
            _ => {
                tracing::debug!(error = %self, "Coupon error");
            }
        }
    }

    /// Render as a failed envelope, using `fallback` for unexpected errors
    pub fn into_envelope_response(self, fallback: &str) -> Response {
        self.log();
        self.to_app_error(fallback).into_response()
    }
}

impl From<CouponError> for AppError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::Database(e) => AppError::from(e),
            other => AppError::new(other.kind(), other.to_string()),
        }
    }
}

impl From<JsonRejection> for CouponError {
    fn from(rejection: JsonRejection) -> Self {
        CouponError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for CouponError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error("Internal server error").into_response()
    }
}
