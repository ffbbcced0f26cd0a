// =============================================================================
// RANKING MODULE
// =============================================================================
// Narrows the fulfilled pharmacies down to the few worth pricing:
//   1. fewest substitutions first, keep CANDIDATE_LIMIT
//   2. closest to the customer first, keep PROXIMITY_LIMIT
//
// Both sorts are stable, so ties keep the order the catalog returned.
// =============================================================================

use crate::models::{Coordinate, FulfilledPharmacy};

/// Default number of pharmacies kept after fulfillment ranking
pub const CANDIDATE_LIMIT: usize = 7;

/// Default number of pharmacies that get delivery quotes
pub const PROXIMITY_LIMIT: usize = 3;

/// Order by `replacements_needed` ascending and keep the first `limit`.
pub fn rank_by_fulfillment(
    mut pharmacies: Vec<FulfilledPharmacy>,
    limit: usize,
) -> Vec<FulfilledPharmacy> {
    pharmacies.sort_by_key(|pharmacy| pharmacy.replacements_needed);
    pharmacies.truncate(limit);
    pharmacies
}

/// Straight-line distance on raw degrees.
///
/// Not a great-circle distance; only the ordering matters here.
pub fn planar_distance(lat: f64, lon: f64, user: Coordinate) -> f64 {
    ((lat - user.lat).powi(2) + (lon - user.lng).powi(2)).sqrt()
}

/// Keep the `limit` pharmacies closest to `user`.
///
/// Pharmacies without coordinates are dropped, not ranked last.
pub fn closest(
    pharmacies: Vec<FulfilledPharmacy>,
    user: Coordinate,
    limit: usize,
) -> Vec<FulfilledPharmacy> {
    let mut located: Vec<(f64, FulfilledPharmacy)> = pharmacies
        .into_iter()
        .filter_map(|pharmacy| match (pharmacy.source.lat, pharmacy.source.lon) {
            (Some(lat), Some(lon)) => Some((planar_distance(lat, lon, user), pharmacy)),
            _ => {
                tracing::debug!(code = ?pharmacy.source.code, "Pharmacy has no coordinates, skipped");
                None
            }
        })
        .collect();

    located.sort_by(|(a, _), (b, _)| a.total_cmp(b));

    located
        .into_iter()
        .take(limit)
        .map(|(_, pharmacy)| pharmacy)
        .collect()
}
