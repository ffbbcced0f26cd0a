// =============================================================================
// CATALOG SEARCH CLIENT
// =============================================================================
// Given a city and a shopping list, the Catalog Search service returns every
// pharmacy in that city that stocks the products or their analogs.
// =============================================================================

use std::time::Instant;

use reqwest::{Client, Url};

use crate::error::{AppError, AppResult, CATALOG_SEARCH};
use crate::metrics;
use crate::models::{Pharmacy, SearchResponse, WantedSku};

#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    url: String,
}

impl CatalogClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Search the city's pharmacies for the wanted SKUs.
    ///
    /// `city` is the caller's already-encoded query string and is sent
    /// verbatim.
    ///
    /// # Errors
    ///
    /// - [`AppError::UpstreamUnavailable`] on connect failure or timeout.
    /// - [`AppError::UpstreamProtocol`] on a non-2xx status or a body without
    ///   a `result` list.
    pub async fn search(&self, city: &str, wanted: &[WantedSku]) -> AppResult<Vec<Pharmacy>> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| AppError::Internal(format!("invalid URL_SEARCH {}: {e}", self.url)))?;
        url.set_query(Some(city));

        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .json(wanted)
            .send()
            .await
            .map_err(|e| AppError::unavailable(CATALOG_SEARCH, e));
        metrics::record_upstream_request(CATALOG_SEARCH, start.elapsed().as_secs_f64());

        let response = response?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::unavailable(CATALOG_SEARCH, e))?;

        if !status.is_success() {
            return Err(AppError::bad_status(CATALOG_SEARCH, status.as_u16(), &body));
        }

        let parsed: SearchResponse = serde_json::from_slice(&body).map_err(|e| {
            AppError::protocol(CATALOG_SEARCH, format!("Invalid response format from search API: {e}"))
        })?;

        tracing::debug!(pharmacies = parsed.result.len(), "Catalog search returned");
        Ok(parsed.result)
    }
}
