// =============================================================================
// ERROR MODULE
// =============================================================================
// Every failure the pipeline can produce, and how each one looks over HTTP.
//
// LEARNING NOTES:
// - Each stage returns Result<T, AppError>; `?` short-circuits the pipeline
// - thiserror implements Display from the #[error("...")] attributes
// - IntoResponse turns an AppError into a status code plus a JSON body, so
//   handlers can simply return AppResult<Json<T>>
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Upstream collaborator names, used in messages and metric labels
pub const CATALOG_SEARCH: &str = "catalog_search";
pub const DELIVERY_PRICING: &str = "delivery_pricing";

/// Upstream bodies quoted in error messages are cut to this length
const MAX_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum AppError {
    // -------------------------------------------------------------------------
    // CLIENT ERRORS
    // -------------------------------------------------------------------------
    /// Malformed or missing request fields
    #[error("Invalid request: {0}")]
    Validation(String),

    // -------------------------------------------------------------------------
    // UPSTREAM ERRORS
    // -------------------------------------------------------------------------
    /// Could not reach the collaborator (connect failure, timeout)
    #[error("{service} unavailable: {source}")]
    UpstreamUnavailable {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The collaborator answered, but not with what the contract promises
    #[error("{service} protocol error: {reason}")]
    UpstreamProtocol {
        service: &'static str,
        reason: String,
    },

    // -------------------------------------------------------------------------
    // EMPTY OUTCOMES
    // -------------------------------------------------------------------------
    #[error("No pharmacies found with the provided SKU data")]
    NoPharmaciesFound,

    #[error("No pharmacies found matching the request (either due to requested medication quantities or invalid SKU(s))")]
    NoFulfillablePharmacies,

    #[error("No delivery options found")]
    NoDeliveryOptions,

    #[error("No open pharmacy can deliver the order right now")]
    NoOpenPharmacies,

    // -------------------------------------------------------------------------
    // INTERNAL ERRORS
    // -------------------------------------------------------------------------
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Could not get a response at all (connect, timeout, body read)
    pub fn unavailable(service: &'static str, err: reqwest::Error) -> Self {
        AppError::UpstreamUnavailable {
            service,
            source: err,
        }
    }

    /// Non-2xx answer; keeps the start of the body for the log and the caller
    pub fn bad_status(service: &'static str, status: u16, body: &[u8]) -> Self {
        AppError::UpstreamProtocol {
            service,
            reason: format!("HTTP error {status}: {}", excerpt(body)),
        }
    }

    pub fn protocol(service: &'static str, reason: impl Into<String>) -> Self {
        AppError::UpstreamProtocol {
            service,
            reason: reason.into(),
        }
    }

    /// HTTP status and machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::UpstreamUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE")
            }
            AppError::UpstreamProtocol { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_PROTOCOL_ERROR"),
            AppError::NoPharmaciesFound => (StatusCode::NOT_FOUND, "NO_PHARMACIES_FOUND"),
            AppError::NoFulfillablePharmacies => {
                (StatusCode::NOT_FOUND, "NO_FULFILLABLE_PHARMACIES")
            }
            AppError::NoDeliveryOptions => (StatusCode::NOT_FOUND, "NO_DELIVERY_OPTIONS"),
            AppError::NoOpenPharmacies => (StatusCode::NOT_FOUND, "NO_OPEN_PHARMACIES"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

// =============================================================================
// HTTP RESPONSE CONVERSION
// =============================================================================
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        // Internal details stay in the log, not in the body
        let message = match &self {
            AppError::Internal(_) => "An unexpected error occurred".to_string(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error_code = error_code, error = %self, "Request failed");
        } else {
            tracing::warn!(error_code = error_code, error = %self, "Request rejected");
        }

        let body = ErrorResponse::new(error_code, message);
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// First `MAX_EXCERPT_CHARS` characters of an upstream body, for messages
pub fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(MAX_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
