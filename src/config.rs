// =============================================================================
// CONFIGURATION MODULE
// =============================================================================
// Loads configuration from environment variables into a typed struct that is
// handed to the pipeline at construction time. Nothing reads the environment
// after startup.
// =============================================================================

use anyhow::{Context, Result};
use chrono::FixedOffset;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Asia/Almaty has no DST and sits at UTC+5
const DEFAULT_UTC_OFFSET_HOURS: i32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port (default: 8000)
    pub port: u16,

    /// Catalog Search endpoint (URL_SEARCH)
    pub search_url: String,

    /// Delivery Pricing endpoint (URL_PRICE)
    pub price_url: String,

    /// Timeout applied to every outbound call
    pub upstream_timeout: Duration,

    /// Zone in which opening hours are evaluated
    pub business_offset: FixedOffset,

    /// How many pharmacies survive fulfillment ranking
    pub candidate_limit: usize,

    /// How many of those, closest first, get delivery quotes
    pub proximity_limit: usize,
}

impl Config {
    /// Creates a Config by reading environment variables.
    ///
    /// # Returns
    /// - `Ok(Config)` if all required variables are set and parse
    /// - `Err` naming the offending variable otherwise
    pub fn from_env() -> Result<Self> {
        let offset_hours: i32 = parse_or("BUSINESS_UTC_OFFSET_HOURS", DEFAULT_UTC_OFFSET_HOURS)?;
        let business_offset = FixedOffset::east_opt(offset_hours * 3600)
            .context("BUSINESS_UTC_OFFSET_HOURS is out of range")?;

        Ok(Self {
            port: parse_or("PORT", 8000)?,
            search_url: env::var("URL_SEARCH")
                .context("URL_SEARCH environment variable is required")?,
            price_url: env::var("URL_PRICE")
                .context("URL_PRICE environment variable is required")?,
            upstream_timeout: Duration::from_secs(parse_or("UPSTREAM_TIMEOUT_SECS", 10)?),
            business_offset,
            candidate_limit: parse_or("CANDIDATE_LIMIT", crate::ranking::CANDIDATE_LIMIT)?,
            proximity_limit: parse_or("PROXIMITY_LIMIT", crate::ranking::PROXIMITY_LIMIT)?,
        })
    }
}

/// Read an optional variable, falling back to `default` when unset
fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {name}")),
        Err(_) => Ok(default),
    }
}
