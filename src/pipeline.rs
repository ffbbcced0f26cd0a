// =============================================================================
// PIPELINE MODULE
// =============================================================================
// Runs one request through every stage, in order:
//
//   catalog search -> substitution -> fulfillment ranking -> proximity
//   -> delivery quotes -> best-option selection
//
// Each stage returns new data; the first error ends the run.
// =============================================================================

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Client;
use tracing::{info, Instrument};

use crate::catalog::CatalogClient;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{BestAnalogRequest, SelectionResult};
use crate::pricing::PricingClient;
use crate::quotes::collect_delivery_options;
use crate::{ranking, selector, substitution};

/// Everything a run needs, built once at startup and shared by all requests
#[derive(Clone)]
pub struct Pipeline {
    catalog: CatalogClient,
    pricing: PricingClient,
    business_offset: FixedOffset,
    candidate_limit: usize,
    proximity_limit: usize,
}

impl Pipeline {
    /// Build the pipeline and its shared HTTP client from `config`.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.upstream_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            catalog: CatalogClient::new(client.clone(), config.search_url.clone()),
            pricing: PricingClient::new(client, config.price_url.clone()),
            business_offset: config.business_offset,
            candidate_limit: config.candidate_limit,
            proximity_limit: config.proximity_limit,
        })
    }

    /// Current time in the business zone
    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.business_offset)
    }

    pub async fn run(&self, request: &BestAnalogRequest) -> AppResult<SelectionResult> {
        self.run_at(request, self.now()).await
    }

    /// Same as [`Pipeline::run`], with opening hours evaluated at `now`.
    pub async fn run_at(
        &self,
        request: &BestAnalogRequest,
        now: DateTime<FixedOffset>,
    ) -> AppResult<SelectionResult> {
        let span = tracing::info_span!(
            "best_analog",
            run_id = %uuid::Uuid::new_v4(),
            city = %request.city,
            skus = request.skus.len()
        );
        self.stages(request, now).instrument(span).await
    }

    async fn stages(
        &self,
        request: &BestAnalogRequest,
        now: DateTime<FixedOffset>,
    ) -> AppResult<SelectionResult> {
        let found = self.catalog.search(&request.city, &request.skus).await?;
        metrics::set_stage_candidates("search", found.len());
        if found.is_empty() {
            return Err(AppError::NoPharmaciesFound);
        }

        let fulfilled = substitution::fulfill_all(&found);
        metrics::set_stage_candidates("fulfilled", fulfilled.len());
        info!(found = found.len(), fulfilled = fulfilled.len(), "Substitution done");
        if fulfilled.is_empty() {
            return Err(AppError::NoFulfillablePharmacies);
        }

        let ranked = ranking::rank_by_fulfillment(fulfilled, self.candidate_limit);
        let nearest = ranking::closest(ranked, request.address, self.proximity_limit);
        metrics::set_stage_candidates("nearest", nearest.len());
        info!(nearest = nearest.len(), "Shortlist ready for pricing");

        let options = collect_delivery_options(&self.pricing, &nearest, request.address).await?;
        metrics::set_stage_candidates("options", options.len());
        if options.is_empty() {
            return Err(AppError::NoDeliveryOptions);
        }

        selector::select_best(&options, now)
    }
}
