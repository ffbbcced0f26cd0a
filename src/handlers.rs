// =============================================================================
// HANDLERS MODULE
// =============================================================================
// HTTP request handlers.
//
// AXUM EXTRACTORS USED:
// - State<T>: Access shared application state
// - Bytes: Raw request body. Parsed with serde_json by hand so clients that
//   omit the Content-Type header are still served, and a malformed body
//   becomes our own 400 error instead of axum's plain-text rejection
// =============================================================================

use axum::{body::Bytes, extract::State, Json};
use std::sync::Arc;
use std::time::Instant;

use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{BestAnalogRequest, HealthResponse, SelectionResult};
use crate::AppState;

/// Liveness check
///
/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus metrics endpoint
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    match &state.metrics_handle {
        Some(handle) => handle.render(),
        None => String::new(),
    }
}

// -----------------------------------------------------------------------------
// BEST ANALOG
// -----------------------------------------------------------------------------
/// Pick the pharmacy/delivery combinations to offer
///
/// POST /best_analog
///
/// # Request Body
/// ```json
/// {
///   "city": "city=6bd3a1c0",
///   "skus": [{ "sku": "dc12ea01-...", "count_desired": 1 }],
///   "address": { "lat": 43.24, "lng": 76.88 }
/// }
/// ```
///
/// # Response
/// - 200 OK: cheapest/fastest options with their alternatives
/// - 400 Bad Request: malformed body
/// - 404 Not Found: nothing can fill the list or deliver it
/// - 502/503: an upstream service failed
pub async fn best_analog(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Json<SelectionResult>> {
    let start = Instant::now();

    let result = match serde_json::from_slice::<BestAnalogRequest>(&body) {
        Ok(request) => match request.validate() {
            Ok(()) => {
                tracing::info!(
                    city = %request.city,
                    skus = request.skus.len(),
                    "Selecting best delivery option"
                );
                state.pipeline.run(&request).await
            }
            Err(reason) => Err(AppError::Validation(reason)),
        },
        Err(e) => Err(AppError::Validation(format!("Invalid JSON format: {e}"))),
    };

    let duration = start.elapsed().as_secs_f64();
    let (status, outcome) = match &result {
        Ok(_) => (200, "selected"),
        Err(err) => {
            let (status, code) = err.status_and_code();
            (status.as_u16(), code)
        }
    };
    metrics::record_http_request("POST", "/best_analog", status, duration);
    metrics::record_selection_outcome(outcome);

    result.map(Json)
}
