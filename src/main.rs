// =============================================================================
// PHARMACY SELECTOR - Main Entry Point
// =============================================================================
// Answers "given a shopping list of medicines, a city and a delivery address,
// which pharmacy and courier should we offer?"
//
// WHAT THIS SERVICE DOES:
// - Searches the city's pharmacies for the requested SKUs
// - Substitutes the cheapest analog where stock runs short
// - Shortlists the pharmacies needing the fewest substitutions, nearest first
// - Prices delivery from each shortlisted pharmacy, concurrently
// - Picks the cheapest and fastest offers, honoring opening hours
// =============================================================================

mod catalog; // Catalog Search client (catalog.rs)
mod config; // Configuration loading (config.rs)
mod error; // Error types (error.rs)
mod handlers; // HTTP request handlers (handlers.rs)
mod hours; // Opening-hours evaluation (hours.rs)
mod metrics; // Prometheus metrics setup (metrics.rs)
mod models; // Data structures (models.rs)
mod pipeline; // Stage sequencing (pipeline.rs)
mod pricing; // Delivery Pricing client (pricing.rs)
mod quotes; // Delivery quote aggregation (quotes.rs)
mod ranking; // Fulfillment and proximity ranking (ranking.rs)
mod selector; // Best-option selection (selector.rs)
mod substitution; // Stock/analog substitution (substitution.rs)

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::metrics::setup_metrics;
use crate::pipeline::Pipeline;

// -----------------------------------------------------------------------------
// APPLICATION STATE
// -----------------------------------------------------------------------------
// Read-only after startup. Requests share it through an Arc and never
// mutate it, so no locks are needed.
pub struct AppState {
    pub pipeline: Pipeline,

    /// Prometheus render handle; absent when no recorder is installed
    pub metrics_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

/// Build the router with all routes and middleware layers.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/best_analog", post(handlers::best_analog))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    // RUST_LOG controls levels, e.g. RUST_LOG=info,pharmacy_selector=debug
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pharmacy_selector=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Pharmacy Selector...");

    let config = Config::from_env()?;
    info!(
        port = config.port,
        search_url = %config.search_url,
        price_url = %config.price_url,
        "Configuration loaded"
    );

    let metrics_handle = setup_metrics()?;
    info!("Prometheus metrics initialized");

    let pipeline = Pipeline::new(&config)?;

    let state = Arc::new(AppState {
        pipeline,
        metrics_handle: Some(metrics_handle),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "Pharmacy Selector is listening");

    axum::serve(listener, app(state)).await?;

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
// Drive the full router in-process with tower's `oneshot`; upstream services
// are wiremock servers.
#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::pipeline::tests::{mount_three_pharmacies, request, test_config};

    fn test_app(server: &MockServer) -> Router {
        let pipeline = Pipeline::new(&test_config(server)).expect("pipeline");
        app(Arc::new(AppState {
            pipeline,
            metrics_handle: None,
        }))
    }

    async fn post_json(app: Router, body: String) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/best_analog")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let server = MockServer::start().await;
        let response = test_app(&server)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn best_analog_returns_selection() {
        let server = MockServer::start().await;
        mount_three_pharmacies(&server).await;

        let body = serde_json::to_string(&request()).expect("serializable");
        let (status, json) = post_json(test_app(&server), body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["cheapest_delivery_option"]["pharmacy"]["source"]["code"], json!("p20"));
        assert_eq!(json["cheapest_delivery_option"]["total_price"], json!(1520.0));
        assert_eq!(
            json["cheapest_delivery_option"]["delivery_option"]["provider"],
            json!("courier")
        );
        assert_eq!(json["alternative_cheapest_option"], Value::Null);
    }

    #[tokio::test]
    async fn body_without_content_type_is_accepted() {
        let server = MockServer::start().await;
        mount_three_pharmacies(&server).await;

        let body = serde_json::to_string(&request()).expect("serializable");
        let response = test_app(&server)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/best_analog")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let server = MockServer::start().await;
        let (status, json) = post_json(test_app(&server), "{not json".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], json!("VALIDATION_ERROR"));
        assert!(json["message"].as_str().unwrap_or_default().contains("Invalid JSON format"));
    }

    #[tokio::test]
    async fn missing_fields_are_bad_request() {
        let server = MockServer::start().await;
        let body = json!({ "city": "city=almaty", "skus": [], "address": { "lat": 1.0, "lng": 2.0 } });
        let (status, json) = post_json(test_app(&server), body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap_or_default().contains("required"));
    }

    #[tokio::test]
    async fn upstream_failure_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
            .mount(&server)
            .await;

        let body = serde_json::to_string(&request()).expect("serializable");
        let (status, json) = post_json(test_app(&server), body).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"], json!("UPSTREAM_PROTOCOL_ERROR"));
    }

    #[tokio::test]
    async fn empty_search_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": [] })))
            .mount(&server)
            .await;

        let body = serde_json::to_string(&request()).expect("serializable");
        let (status, json) = post_json(test_app(&server), body).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], json!("NO_PHARMACIES_FOUND"));
    }
}
