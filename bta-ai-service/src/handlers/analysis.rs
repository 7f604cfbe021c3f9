//! The analysis endpoint.
//!
//! One handler serves every method on the route. The CORS decision is made
//! once, up front, and every exit (preflight, rejection, generation result,
//! panic) is built by [`respond`] from that decision.

use crate::error::AnalysisError;
use crate::models::{AnalysisRequest, Mode};
use crate::services::metrics;
use crate::services::prompt::build_generation_request;
use crate::services::providers::{ProviderError, ProviderResponse};
use crate::services::AccessDecision;
use crate::startup::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::Response,
};
use futures::FutureExt;
use serde::Serialize;
use serde_json::json;
use service_core::middleware::RequestId;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

/// Successful analysis: the report mode and generated text.
#[derive(Debug)]
struct Analysis {
    mode: Mode,
    text: String,
}

pub async fn analyze(State(state): State<AppState>, request: Request) -> Response {
    let decision = state
        .origin_policy
        .evaluate(request.headers().get(header::ORIGIN));
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    if request.method() == Method::OPTIONS {
        metrics::record_request("preflight");
        return preflight(&decision);
    }

    let outcome = AssertUnwindSafe(run_pipeline(&state, &decision, request))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(AnalysisError::UnhandledFault(panic_message(&*panic))));

    match outcome {
        Ok(analysis) => {
            metrics::record_request("ok");
            metrics::record_report(analysis.mode.as_str());
            respond(
                &decision,
                StatusCode::OK,
                &json!({ "ok": true, "text": analysis.text }),
            )
        }
        Err(err) => {
            metrics::record_request(err.kind());
            log_rejection(&err, &request_id);
            error_response(&decision, &err)
        }
    }
}

/// Method gate, origin enforcement, validation, generation. Short-circuits
/// on the first failure.
async fn run_pipeline(
    state: &AppState,
    decision: &AccessDecision,
    request: Request,
) -> Result<Analysis, AnalysisError> {
    if request.method() != Method::POST {
        return Err(AnalysisError::MethodNotAllowed(request.method().clone()));
    }

    if !decision.is_allowed() {
        return Err(AnalysisError::ForbiddenOrigin);
    }

    let body = axum::body::to_bytes(request.into_body(), state.config.max_body_bytes)
        .await
        .map_err(|e| AnalysisError::InvalidBody(e.to_string()))?;

    let analysis_request = AnalysisRequest::from_slice(&body)?;

    let provider = state
        .text_provider
        .as_ref()
        .ok_or(AnalysisError::MissingConfiguration)?;

    let generation = build_generation_request(&analysis_request)
        .map_err(|e| AnalysisError::UnhandledFault(format!("Failed to encode input: {}", e)))?;

    let timeout = state.config.generation_timeout;
    let started = Instant::now();
    let result = match tokio::time::timeout(timeout, provider.generate(&generation)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout)),
    };
    metrics::record_provider_latency(
        provider.name(),
        provider.model(),
        started.elapsed().as_secs_f64(),
    );

    let ProviderResponse {
        text,
        input_tokens,
        output_tokens,
        truncated,
    } = result.map_err(|e| {
        metrics::record_provider_error(provider.name(), e.error_type());
        AnalysisError::GenerationFailure(e)
    })?;

    metrics::record_tokens(provider.model(), input_tokens, output_tokens);
    tracing::info!(
        mode = %analysis_request.mode,
        section_id = analysis_request.section_id.as_deref().unwrap_or("-"),
        provider = provider.name(),
        model = provider.model(),
        text_len = text.len(),
        input_tokens = input_tokens.unwrap_or(0),
        output_tokens = output_tokens.unwrap_or(0),
        truncated,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Analysis generated"
    );

    Ok(Analysis {
        mode: analysis_request.mode,
        text,
    })
}

/// The single response constructor for this route.
fn respond<T: Serialize>(decision: &AccessDecision, status: StatusCode, body: &T) -> Response {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            return respond(
                decision,
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": "Internal server error" }),
            );
        }
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    decision.apply(headers);
    response
}

fn error_response(decision: &AccessDecision, err: &AnalysisError) -> Response {
    let mut response = respond(decision, err.status_code(), &err.body());
    if let AnalysisError::MethodNotAllowed(_) = err {
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("POST, OPTIONS"));
    }
    response
}

/// Preflight: no body, CORS headers only. Never rejected, so the browser can
/// read the (possibly `null`) grant.
fn preflight(decision: &AccessDecision) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    decision.apply(response.headers_mut());
    response
}

fn log_rejection(err: &AnalysisError, request_id: &str) {
    match err {
        AnalysisError::GenerationFailure(_)
        | AnalysisError::MissingConfiguration
        | AnalysisError::UnhandledFault(_) => tracing::error!(
            request_id = %request_id,
            kind = err.kind(),
            error = %err,
            "Analysis request failed"
        ),
        AnalysisError::ForbiddenOrigin => tracing::warn!(
            request_id = %request_id,
            kind = err.kind(),
            "Rejected analysis request from origin outside the allow-list"
        ),
        _ => tracing::info!(
            request_id = %request_id,
            kind = err.kind(),
            error = %err,
            "Rejected analysis request"
        ),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
