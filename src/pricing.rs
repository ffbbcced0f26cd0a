// =============================================================================
// DELIVERY PRICING CLIENT
// =============================================================================
// Quotes courier offers for carrying one pharmacy's items to the customer.
// =============================================================================

use std::time::Instant;

use reqwest::Client;

use crate::error::{excerpt, AppError, AppResult, DELIVERY_PRICING};
use crate::metrics;
use crate::models::{DeliveryPriceRequest, DeliveryPriceResponse, DeliveryPriceResult};

const SUCCESS: &str = "success";

#[derive(Clone)]
pub struct PricingClient {
    client: Client,
    url: String,
}

impl PricingClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Ask for courier offers delivering `request.items` from the pharmacy
    /// `request.source_code` to `request.dst`.
    ///
    /// # Errors
    ///
    /// - [`AppError::UpstreamUnavailable`] on connect failure or timeout.
    /// - [`AppError::UpstreamProtocol`] on a non-2xx status, a status other
    ///   than `"success"`, or a body without `result.delivery`.
    pub async fn quote(&self, request: &DeliveryPriceRequest) -> AppResult<DeliveryPriceResult> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::unavailable(DELIVERY_PRICING, e));
        metrics::record_upstream_request(DELIVERY_PRICING, start.elapsed().as_secs_f64());

        let response = response?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::unavailable(DELIVERY_PRICING, e))?;

        if !status.is_success() {
            return Err(AppError::bad_status(DELIVERY_PRICING, status.as_u16(), &body));
        }

        let parsed: DeliveryPriceResponse = serde_json::from_slice(&body).map_err(|e| {
            AppError::protocol(
                DELIVERY_PRICING,
                format!("Unexpected response format from URL_PRICE API: {e}"),
            )
        })?;

        tracing::info!(
            source_code = %request.source_code,
            status = %parsed.status,
            "Response from delivery pricing"
        );

        if parsed.status != SUCCESS {
            return Err(AppError::protocol(
                DELIVERY_PRICING,
                format!(
                    "status was {:?} for pharmacy {}: {}",
                    parsed.status,
                    request.source_code,
                    excerpt(&body)
                ),
            ));
        }

        parsed.result.ok_or_else(|| {
            AppError::protocol(DELIVERY_PRICING, "success response without a result")
        })
    }
}
