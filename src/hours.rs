// =============================================================================
// OPENING HOURS MODULE
// =============================================================================
// Classifies a pharmacy as open, closing soon, or closed at a given moment.
//
// LEARNING NOTES:
// - `opens_at`/`closes_at` arrive as UTC instants; "now" is supplied in the
//   business time zone and both sides are compared in that zone
// - Anything that cannot be parsed counts as closed: it is better to skip a
//   pharmacy than to promise a delivery from a shop that may be shut
// =============================================================================

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::models::PharmacySource;

/// Values of `opening_hours` that mean the pharmacy never closes
pub const ROUND_THE_CLOCK: [&str; 2] = ["Круглосуточно", "Round-the-clock"];

/// Wire format of `opens_at` / `closes_at`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A pharmacy closing within this window is "closing soon"
pub fn closing_soon_window() -> Duration {
    Duration::hours(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenStatus {
    Open,
    ClosingSoon,
    Closed,
}

impl OpenStatus {
    pub fn is_closed(self) -> bool {
        self == OpenStatus::Closed
    }
}

/// Opening and closing instants for today, in the business zone
struct Schedule {
    opens: DateTime<FixedOffset>,
    closes: DateTime<FixedOffset>,
}

fn is_round_the_clock(opening_hours: &str) -> bool {
    ROUND_THE_CLOCK.contains(&opening_hours.trim())
}

fn parse_instant(raw: &str, zone: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive).with_timezone(zone))
}

fn schedule(source: &PharmacySource, zone: &FixedOffset) -> Option<Schedule> {
    let opens = source.opens_at.as_deref().and_then(|raw| parse_instant(raw, zone));
    let closes = source.closes_at.as_deref().and_then(|raw| parse_instant(raw, zone));

    match (opens, closes) {
        (Some(opens), Some(closes)) => Some(Schedule { opens, closes }),
        _ => {
            tracing::warn!(
                code = ?source.code,
                opens_at = ?source.opens_at,
                closes_at = ?source.closes_at,
                "Unparseable opening hours, treating pharmacy as closed"
            );
            None
        }
    }
}

/// Is the pharmacy closed at `now`?
pub fn is_closed(source: &PharmacySource, now: DateTime<FixedOffset>) -> bool {
    if is_round_the_clock(&source.opening_hours) {
        return false;
    }
    let Some(Schedule { opens, closes }) = schedule(source, now.offset()) else {
        return true;
    };

    if now < opens {
        return true;
    }
    if now >= closes && now < opens + Duration::days(1) {
        return true;
    }
    !(opens <= now && now < closes)
}

/// Does the pharmacy close within the next hour?
///
/// True when `0 <= closes_at - now <= 1h`. A pharmacy that has not opened yet
/// is not closing soon.
pub fn is_closing_soon(source: &PharmacySource, now: DateTime<FixedOffset>) -> bool {
    if is_round_the_clock(&source.opening_hours) {
        return false;
    }
    let Some(Schedule { opens, closes }) = schedule(source, now.offset()) else {
        return true;
    };

    if now < opens {
        return false;
    }
    let remaining = closes - now;
    remaining >= Duration::zero() && remaining <= closing_soon_window()
}

pub fn classify(source: &PharmacySource, now: DateTime<FixedOffset>) -> OpenStatus {
    if is_closed(source, now) {
        OpenStatus::Closed
    } else if is_closing_soon(source, now) {
        OpenStatus::ClosingSoon
    } else {
        OpenStatus::Open
    }
}
