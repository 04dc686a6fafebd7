// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from domain errors to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use confluo_core::ConfluoError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned by gateway handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource (message, channel) does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Request signature or credentials did not check out.
    #[error("{0}")]
    Unauthorized(String),
    /// The feature behind this route is not configured.
    #[error("{0}")]
    Unavailable(String),
    /// Any failure from the cache, adapters, drafter or breakers.
    #[error(transparent)]
    Domain(#[from] ConfluoError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Domain(err) => match err {
                ConfluoError::Validation(_) => StatusCode::BAD_REQUEST,
                ConfluoError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
                ConfluoError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                ConfluoError::Channel { .. } | ConfluoError::Provider { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                ConfluoError::Config(_) | ConfluoError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
