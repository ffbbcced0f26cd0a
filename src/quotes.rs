// =============================================================================
// DELIVERY QUOTE AGGREGATOR
// =============================================================================
// Prices delivery for every shortlisted pharmacy and flattens all courier
// offers into one list the selector can scan.
//
// LEARNING NOTES:
// - The calls are independent, so they run concurrently with try_join_all
// - try_join_all stops at the first error and drops the other futures,
//   which cancels their in-flight HTTP requests
// - Dropping the whole future (client went away) cancels everything too
// =============================================================================

use futures::future::try_join_all;

use crate::error::AppResult;
use crate::models::{Coordinate, DeliveryOption, DeliveryPriceRequest, FulfilledPharmacy};
use crate::pricing::PricingClient;

/// Build the pricing request for one pharmacy, or `None` when it cannot be
/// priced (no code, nothing to ship).
fn price_request(pharmacy: &FulfilledPharmacy, dst: Coordinate) -> Option<DeliveryPriceRequest> {
    let Some(source_code) = pharmacy.source.code.clone() else {
        tracing::warn!(name = %pharmacy.source.name, "Pharmacy without code cannot be priced");
        return None;
    };

    let items = pharmacy.delivery_items();
    if items.is_empty() {
        return None;
    }

    Some(DeliveryPriceRequest {
        items,
        dst,
        source_code,
    })
}

async fn quote_pharmacy(
    pricing: &PricingClient,
    pharmacy: &FulfilledPharmacy,
    request: DeliveryPriceRequest,
) -> AppResult<Vec<DeliveryOption>> {
    let priced = pricing.quote(&request).await?;

    // Some pricing deployments report the basket price themselves
    let items_cost = priced.items_price.unwrap_or(pharmacy.total_sum);

    Ok(priced
        .delivery
        .into_iter()
        .map(|offer| DeliveryOption {
            pharmacy: pharmacy.clone(),
            total_price: items_cost + offer.price,
            delivery_option: offer,
        })
        .collect())
}

/// Collect every delivery offer for `pharmacies`.
///
/// # Errors
/// The first pricing failure fails the whole call; no partial list is
/// returned.
pub async fn collect_delivery_options(
    pricing: &PricingClient,
    pharmacies: &[FulfilledPharmacy],
    dst: Coordinate,
) -> AppResult<Vec<DeliveryOption>> {
    let calls = pharmacies.iter().filter_map(|pharmacy| {
        price_request(pharmacy, dst).map(|request| quote_pharmacy(pricing, pharmacy, request))
    });

    let per_pharmacy = try_join_all(calls).await?;
    let options: Vec<DeliveryOption> = per_pharmacy.into_iter().flatten().collect();

    tracing::info!(
        pharmacies = pharmacies.len(),
        options = options.len(),
        "Delivery options collected"
    );
    Ok(options)
}
