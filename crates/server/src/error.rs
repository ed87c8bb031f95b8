//! HTTP mapping for [`ExportError`].
//!
//! Errors are returned as plain text carrying the error's message, which the
//! host shows to the user as-is.

use std::fmt;

use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use dbexport_core::ExportError;
use tracing::{debug, error};

/// An [`ExportError`] on its way out as a response.
#[derive(Debug)]
pub struct ApiError {
    inner: ExportError,
}

impl ApiError {
    pub fn inner(&self) -> &ExportError {
        &self.inner
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match &self.inner {
            ExportError::DatabaseNotFound { .. } => StatusCode::NOT_FOUND,
            ExportError::NotExportable
            | ExportError::Auth(_)
            | ExportError::InsufficientSpace { .. } => StatusCode::FORBIDDEN,
            ExportError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            ExportError::Produce { .. } | ExportError::Io(_) | ExportError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if self.inner.is_client_error() {
            debug!(status = status.as_u16(), error = %self.inner, "export refused");
        } else {
            error!(status = status.as_u16(), error = %self.inner, "export failed");
        }
        HttpResponse::build(status)
            .insert_header(ContentType::plaintext())
            .body(self.inner.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(inner: ExportError) -> Self {
        Self { inner }
    }
}
