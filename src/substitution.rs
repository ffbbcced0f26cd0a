// =============================================================================
// SUBSTITUTION ENGINE
// =============================================================================
// Decides, pharmacy by pharmacy, whether the whole shopping list can be
// filled, either from stock or by swapping in the cheapest analog that has
// enough units.
//
// Fulfillment is all-or-nothing: one unfillable line rejects the pharmacy.
// =============================================================================

use crate::models::{FulfilledPharmacy, Pharmacy, Product, ReplacedSku};

/// Pharmacies need at least this many substitutions to be forwarded.
///
/// Perfect matches (zero substitutions) are served by a separate, simpler
/// flow, so this pipeline only deals with pharmacies that need analogs.
pub const MIN_REPLACEMENTS: u32 = 1;

/// Outcome of evaluating a single pharmacy
#[derive(Debug, Clone)]
pub enum Fulfillment {
    Fulfilled(FulfilledPharmacy),
    /// `sku` is the first product that had neither stock nor a usable analog
    Rejected { sku: String },
}

/// How one line of the list is served
enum Line {
    FromStock(Product),
    Substituted { original: Product, analog: Product },
}

impl Line {
    fn unit_price(&self) -> f64 {
        match self {
            Line::FromStock(product) => product.base_price,
            Line::Substituted { analog, .. } => analog.base_price,
        }
    }
}

/// Cheapest analog with enough units; the first one wins a price tie.
fn cheapest_analog(product: &Product) -> Option<&Product> {
    product
        .analogs
        .iter()
        .filter(|analog| analog.quantity >= product.quantity_desired)
        .fold(None, |best: Option<&Product>, analog| match best {
            Some(current) if current.base_price <= analog.base_price => Some(current),
            _ => Some(analog),
        })
}

fn serve(product: &Product) -> Option<Line> {
    if product.in_stock() {
        let mut kept = product.clone();
        kept.analogs.clear();
        return Some(Line::FromStock(kept));
    }

    cheapest_analog(product).map(|analog| {
        let mut chosen = analog.clone();
        chosen.quantity_desired = product.quantity_desired;
        chosen.analogs.clear();
        Line::Substituted {
            original: product.clone(),
            analog: chosen,
        }
    })
}

/// Evaluate one pharmacy against its product list.
pub fn evaluate(pharmacy: &Pharmacy) -> Fulfillment {
    let mut products = Vec::with_capacity(pharmacy.products.len());
    let mut replaced_skus = Vec::new();
    let mut total_sum = 0.0;

    for product in &pharmacy.products {
        let Some(line) = serve(product) else {
            return Fulfillment::Rejected {
                sku: product.sku.clone(),
            };
        };

        total_sum += line.unit_price() * f64::from(product.quantity_desired);

        match line {
            Line::FromStock(kept) => products.push(kept),
            Line::Substituted {
                mut original,
                analog,
            } => {
                replaced_skus.push(ReplacedSku {
                    original_sku: original.sku.clone(),
                    replacement_sku: analog.sku.clone(),
                });
                original.analogs = vec![analog];
                products.push(original);
            }
        }
    }

    Fulfillment::Fulfilled(FulfilledPharmacy {
        source: pharmacy.source.clone(),
        products,
        total_sum,
        replacements_needed: replaced_skus.len() as u32,
        replaced_skus,
    })
}

/// Run every pharmacy through [`evaluate`], keeping those that can fill the
/// list and needed at least [`MIN_REPLACEMENTS`] substitutions.
pub fn fulfill_all(pharmacies: &[Pharmacy]) -> Vec<FulfilledPharmacy> {
    pharmacies
        .iter()
        .filter_map(|pharmacy| match evaluate(pharmacy) {
            Fulfillment::Fulfilled(fulfilled) if fulfilled.replacements_needed >= MIN_REPLACEMENTS => {
                Some(fulfilled)
            }
            Fulfillment::Fulfilled(fulfilled) => {
                tracing::debug!(
                    code = ?fulfilled.source.code,
                    "Pharmacy has everything in stock, left to the exact-match flow"
                );
                None
            }
            Fulfillment::Rejected { sku } => {
                tracing::debug!(
                    code = ?pharmacy.source.code,
                    sku = %sku,
                    "Pharmacy cannot fill the list"
                );
                None
            }
        })
        .collect()
}
