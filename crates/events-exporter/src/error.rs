//! Error types for the exporter.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for exporter operations.
pub type ExporterResult<T> = Result<T, ExporterError>;

/// Errors that can occur in the exporter.
#[derive(Debug, Error)]
pub enum ExporterError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    BindFailed(std::net::SocketAddr, std::io::Error),

    /// The HTTP server stopped with an error.
    #[error("server error: {0}")]
    Server(std::io::Error),

    /// The events source could not be opened.
    #[error("failed to open events source {path}: {source}")]
    SourceOpen {
        /// Path that was given as the events source.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The events stream could not be read or is not valid JSON.
    #[error("events stream error: {0}")]
    SourceRead(#[from] serde_json::Error),

    /// The events stream ended.
    #[error("events stream ended")]
    SourceEnded,

    /// A field selector could not be parsed.
    #[error("invalid field selector {selector:?}: {reason}")]
    InvalidSelector {
        /// The selector as given.
        selector: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Logging could not be initialized.
    #[error("logging setup failed: {0}")]
    Logging(String),

    /// The metrics vault rejected an operation.
    #[error(transparent)]
    Vault(#[from] event_vault::VaultError),
}

/// Error body returned by the HTTP handlers.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ExporterError {
    fn into_response(self) -> Response {
        // Nothing a scraper sends can cause these, so every variant is a 500.
        let body = ErrorResponse {
            error: "internal_error".to_string(),
            message: self.to_string(),
        };

        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"error":"internal_error","message":"failed to serialize error"}"#.to_string()
        });

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "application/json")],
            json,
        )
            .into_response()
    }
}
