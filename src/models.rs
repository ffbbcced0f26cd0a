// =============================================================================
// MODELS MODULE
// =============================================================================
// Data structures shared by every pipeline stage.
//
// LEARNING NOTES:
// - Upstream JSON is deserialized once, at the boundary, into these types
// - Fields the selector never reads are kept in `extra` maps via
//   #[serde(flatten)] so they are echoed back to the caller untouched
// - Every stage builds new values; nothing here is mutated after creation
// =============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// INBOUND REQUEST
// =============================================================================

/// Request body for `POST /best_analog`
///
/// # Example JSON
/// ```json
/// {
///   "city": "city=6bd3a1c0",
///   "skus": [{ "sku": "dc12ea01-...", "count_desired": 1 }],
///   "address": { "lat": 43.24, "lng": 76.88 }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestAnalogRequest {
    /// Encoded city identifier, forwarded to Catalog Search as its query string
    pub city: String,

    /// Shopping list
    pub skus: Vec<WantedSku>,

    /// Where the order is delivered
    pub address: Coordinate,
}

/// One line of the shopping list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WantedSku {
    pub sku: String,
    pub count_desired: u32,
}

/// A point on the map. Uses `lng` to match the upstream wire format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl BestAnalogRequest {
    /// Check the fields serde cannot check on its own.
    ///
    /// Types (integer counts, numeric coordinates) are already enforced by
    /// deserialization; this covers emptiness and ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.city.trim().is_empty() {
            return Err("City, SKU data, and user coordinates are required".to_string());
        }
        if self.skus.is_empty() {
            return Err("City, SKU data, and user coordinates are required".to_string());
        }
        for wanted in &self.skus {
            if wanted.sku.trim().is_empty() {
                return Err("Invalid SKU format or count type".to_string());
            }
            if wanted.count_desired == 0 {
                return Err(format!(
                    "count_desired must be a positive integer for SKU {}",
                    wanted.sku
                ));
            }
        }
        if !self.address.lat.is_finite() || !self.address.lng.is_finite() {
            return Err("Invalid data type for user coordinates".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// CATALOG SEARCH RESULT
// =============================================================================

/// Body of a successful Catalog Search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub result: Vec<Pharmacy>,
}

/// One pharmacy from the search, with its stock for the requested SKUs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pharmacy {
    pub source: PharmacySource,
    #[serde(default)]
    pub products: Vec<Product>,
}

/// Pharmacy metadata: identity, location and opening hours
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PharmacySource {
    /// Unique per pharmacy. Without it the pharmacy cannot be priced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,

    /// Free text such as "Пн-Вс: 08:00-23:00", or the round-the-clock sentinel
    #[serde(default)]
    pub opening_hours: String,

    /// UTC instant, `YYYY-MM-DDTHH:MM:SSZ`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closes_at: Option<String>,

    /// UTC instant, `YYYY-MM-DDTHH:MM:SSZ`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opens_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_code: Option<String>,

    /// Flags and tags (`with_reserve`, `source_tags`, `working_today`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A stocked product, or one of its analogs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub source_code: String,
    pub sku: String,
    #[serde(default)]
    pub name: String,
    pub base_price: f64,
    #[serde(default)]
    pub price_with_warehouse_discount: f64,
    #[serde(default)]
    pub warehouse_discount: f64,
    /// Units on the shelf
    pub quantity: u32,
    /// Units the customer asked for
    pub quantity_desired: u32,
    #[serde(default)]
    pub pp_packing: String,
    #[serde(default)]
    pub manufacturer_id: String,
    #[serde(default)]
    pub recipe_needed: bool,
    #[serde(default)]
    pub strong_recipe: bool,
    /// Substitutes stocked by the same pharmacy
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analogs: Vec<Product>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.quantity >= self.quantity_desired
    }
}

// =============================================================================
// FULFILLMENT
// =============================================================================

/// A pharmacy that can fill the whole shopping list
///
/// Each product either keeps no analogs (served from stock) or exactly one,
/// the substitute that will be shipped instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfilledPharmacy {
    pub source: PharmacySource,
    pub products: Vec<Product>,
    pub total_sum: f64,
    pub replacements_needed: u32,
    pub replaced_skus: Vec<ReplacedSku>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplacedSku {
    pub original_sku: String,
    pub replacement_sku: String,
}

impl FulfilledPharmacy {
    /// The list actually shipped: substitute SKUs where one was chosen
    pub fn delivery_items(&self) -> Vec<DeliveryItem> {
        self.products
            .iter()
            .map(|product| {
                let sku = product
                    .analogs
                    .first()
                    .map_or(&product.sku, |substitute| &substitute.sku);
                DeliveryItem {
                    sku: sku.clone(),
                    quantity: product.quantity_desired,
                }
            })
            .collect()
    }
}

// =============================================================================
// DELIVERY PRICING
// =============================================================================

/// Request body sent to Delivery Pricing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPriceRequest {
    pub items: Vec<DeliveryItem>,
    pub dst: Coordinate,
    pub source_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryItem {
    pub sku: String,
    pub quantity: u32,
}

/// Raw Delivery Pricing response. Checked by the client before use.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryPriceResponse {
    pub status: String,
    pub result: Option<DeliveryPriceResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryPriceResult {
    pub delivery: Vec<DeliveryQuote>,
    /// Present in one variant of the service: the price of the items
    /// themselves, as the pricing service computed it
    #[serde(default)]
    pub items_price: Option<f64>,
}

/// One courier offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryQuote {
    pub price: f64,
    /// Minutes until delivery
    pub eta: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A priced candidate: one pharmacy combined with one courier offer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOption {
    pub pharmacy: FulfilledPharmacy,
    /// Items plus delivery
    pub total_price: f64,
    pub delivery_option: DeliveryQuote,
}

impl DeliveryOption {
    pub fn code(&self) -> Option<&str> {
        self.pharmacy.source.code.as_deref()
    }

    pub fn eta(&self) -> f64 {
        self.delivery_option.eta
    }
}

// =============================================================================
// SELECTION RESULT
// =============================================================================

/// Response body of `POST /best_analog`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionResult {
    pub cheapest_delivery_option: Option<DeliveryOption>,
    pub alternative_cheapest_option: Option<DeliveryOption>,
    pub fastest_delivery_option: Option<DeliveryOption>,
    pub alternative_fastest_option: Option<DeliveryOption>,
}

// =============================================================================
// HEALTH CHECK RESPONSE
// =============================================================================

/// Simple health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

// =============================================================================
// ERROR RESPONSES
// =============================================================================

/// API error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error kind
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
