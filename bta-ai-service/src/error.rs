//! Failure taxonomy of the analysis pipeline.
//!
//! `AnalysisError` deliberately does not implement `IntoResponse`: every
//! response on the analysis route must go through the handler's shaper so
//! that the per-request CORS grant is attached.

use crate::services::providers::ProviderError;
use axum::http::{Method, StatusCode};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Method {0} not allowed")]
    MethodNotAllowed(Method),

    #[error("Origin is not allow-listed")]
    ForbiddenOrigin,

    #[error("Invalid JSON body: {0}")]
    InvalidBody(String),

    #[error("Missing mode or bta_payload")]
    MissingField,

    #[error("Missing section_id for section_deep_dive")]
    MissingSectionId,

    #[error("Unsupported mode: {0}")]
    UnsupportedMode(String),

    #[error("Generation credential is not configured")]
    MissingConfiguration,

    #[error("Generation request failed: {0}")]
    GenerationFailure(#[from] ProviderError),

    #[error("Unhandled fault: {0}")]
    UnhandledFault(String),
}

/// JSON body of every failure response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AnalysisError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AnalysisError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AnalysisError::ForbiddenOrigin => StatusCode::FORBIDDEN,
            AnalysisError::InvalidBody(_)
            | AnalysisError::MissingField
            | AnalysisError::MissingSectionId
            | AnalysisError::UnsupportedMode(_) => StatusCode::BAD_REQUEST,
            AnalysisError::MissingConfiguration
            | AnalysisError::GenerationFailure(_)
            | AnalysisError::UnhandledFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::MethodNotAllowed(_) => "method_not_allowed",
            AnalysisError::ForbiddenOrigin => "forbidden_origin",
            AnalysisError::InvalidBody(_) => "invalid_body",
            AnalysisError::MissingField => "missing_field",
            AnalysisError::MissingSectionId => "missing_section_id",
            AnalysisError::UnsupportedMode(_) => "unsupported_mode",
            AnalysisError::MissingConfiguration => "missing_configuration",
            AnalysisError::GenerationFailure(_) => "generation_failure",
            AnalysisError::UnhandledFault(_) => "unhandled_fault",
        }
    }

    /// Client-facing body. Panic payloads stay in the logs.
    pub fn body(&self) -> ErrorBody {
        let (error, detail) = match self {
            AnalysisError::MethodNotAllowed(_) => ("Method not allowed", None),
            AnalysisError::ForbiddenOrigin => ("Forbidden origin", None),
            AnalysisError::InvalidBody(reason) => ("Invalid JSON body", Some(reason.clone())),
            AnalysisError::MissingField => ("Missing mode or bta_payload", None),
            AnalysisError::MissingSectionId => ("Missing section_id for section_deep_dive", None),
            AnalysisError::UnsupportedMode(mode) => (
                "Unsupported mode",
                Some(format!(
                    "expected one of section_deep_dive, full_report; got {}",
                    mode
                )),
            ),
            AnalysisError::MissingConfiguration => ("Missing credential configuration", None),
            AnalysisError::GenerationFailure(err) => {
                ("Generation request failed", Some(err.to_string()))
            }
            AnalysisError::UnhandledFault(_) => ("Internal server error", None),
        };

        ErrorBody { error, detail }
    }
}
