// =============================================================================
// BEST-OPTION SELECTOR
// =============================================================================
// Chooses what to offer from the flattened list of priced delivery options:
//
//   Pass 1  cheapest and fastest among OPEN pharmacies. If the running best
//           closes within the hour, also remember the best option from a
//           pharmacy that stays open, as the alternative.
//   Pass 2  a CLOSED pharmacy is offered as the alternative only when it is
//           at least 30% cheaper (or faster) than the open champion.
// =============================================================================

use chrono::{DateTime, FixedOffset};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::hours::{classify, OpenStatus};
use crate::models::{DeliveryOption, SelectionResult};

/// A closed pharmacy must come in at or below this fraction of the open
/// champion's price (or ETA) to be offered.
pub const CLOSED_DISCOUNT_FACTOR: f64 = 0.7;

/// What an option is compared on
#[derive(Debug, Clone, Copy)]
enum Criterion {
    Price,
    Eta,
}

impl Criterion {
    fn key(self, option: &DeliveryOption) -> f64 {
        match self {
            Criterion::Price => option.total_price,
            Criterion::Eta => option.eta(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Criterion::Price => "cheapest",
            Criterion::Eta => "fastest",
        }
    }
}

struct Candidate<'a> {
    option: &'a DeliveryOption,
    status: OpenStatus,
}

/// First option with the smallest key among `eligible`
fn minimum<'a, I>(eligible: I, criterion: Criterion) -> Option<&'a DeliveryOption>
where
    I: IntoIterator<Item = &'a DeliveryOption>,
{
    eligible.into_iter().fold(None, |best, option| match best {
        Some(current) if criterion.key(current) <= criterion.key(option) => Some(current),
        _ => Some(option),
    })
}

/// Pass 1: the open champion, plus a stays-open alternative when the
/// champion is about to close.
fn open_champion<'a>(
    candidates: &[Candidate<'a>],
    criterion: Criterion,
) -> (Option<&'a DeliveryOption>, Option<&'a DeliveryOption>) {
    let mut best: Option<&DeliveryOption> = None;
    let mut alternative: Option<&DeliveryOption> = None;

    for candidate in candidates.iter().filter(|c| !c.status.is_closed()) {
        let improves = best.map_or(true, |current| {
            criterion.key(candidate.option) < criterion.key(current)
        });
        if !improves {
            continue;
        }
        best = Some(candidate.option);

        if candidate.status != OpenStatus::ClosingSoon {
            alternative = None;
            continue;
        }

        info!(
            code = candidate.option.code(),
            criterion = criterion.label(),
            "Pharmacy closes soon, looking for an alternative"
        );
        if alternative.is_none() {
            alternative = minimum(
                candidates
                    .iter()
                    .filter(|c| c.status == OpenStatus::Open)
                    .map(|c| c.option),
                criterion,
            );
            if let Some(found) = alternative {
                info!(
                    code = found.code(),
                    criterion = criterion.label(),
                    total_price = found.total_price,
                    eta = found.eta(),
                    "Found alternative that stays open longer than an hour"
                );
            }
        }
    }

    (best, alternative)
}

/// Pass 2: the best closed option that beats `champion` by the discount margin.
fn closed_challenger<'a>(
    candidates: &[Candidate<'a>],
    champion: Option<&DeliveryOption>,
    criterion: Criterion,
) -> Option<&'a DeliveryOption> {
    let champion = champion?;
    let threshold = criterion.key(champion) * CLOSED_DISCOUNT_FACTOR;

    minimum(
        candidates
            .iter()
            .filter(|c| c.status.is_closed())
            .map(|c| c.option)
            .filter(|option| {
                let qualifies = criterion.key(option) <= threshold;
                if !qualifies {
                    tracing::debug!(
                        code = option.code(),
                        criterion = criterion.label(),
                        "Closed pharmacy does not beat the open one by the required margin"
                    );
                }
                qualifies
            }),
        criterion,
    )
}

/// Pick the options to offer, evaluating opening hours at `now`.
///
/// # Errors
/// - [`AppError::NoDeliveryOptions`] when there is nothing to choose from
/// - [`AppError::NoOpenPharmacies`] when every pharmacy is closed
pub fn select_best(
    options: &[DeliveryOption],
    now: DateTime<FixedOffset>,
) -> AppResult<SelectionResult> {
    let candidates: Vec<Candidate> = options
        .iter()
        .filter(|option| {
            if option.code().is_none() {
                tracing::warn!(name = %option.pharmacy.source.name, "Missing code in pharmacy source");
            }
            option.code().is_some()
        })
        .map(|option| Candidate {
            option,
            status: classify(&option.pharmacy.source, now),
        })
        .collect();

    if candidates.is_empty() {
        return Err(AppError::NoDeliveryOptions);
    }

    let (cheapest_open, alternative_cheapest) = open_champion(&candidates, Criterion::Price);
    let (fastest_open, alternative_fastest) = open_champion(&candidates, Criterion::Eta);

    let Some(cheapest_open) = cheapest_open else {
        return Err(AppError::NoOpenPharmacies);
    };

    let cheapest_closed = closed_challenger(&candidates, Some(cheapest_open), Criterion::Price);
    let fastest_closed = closed_challenger(&candidates, fastest_open, Criterion::Eta);

    if let Some(cheapest_closed) = cheapest_closed {
        info!(
            open_code = cheapest_open.code(),
            closed_code = cheapest_closed.code(),
            "Closed pharmacy is at least 30% cheaper, offering it as the alternative"
        );
        return Ok(SelectionResult {
            cheapest_delivery_option: Some(cheapest_open.clone()),
            alternative_cheapest_option: Some(cheapest_closed.clone()),
            fastest_delivery_option: fastest_open.cloned(),
            alternative_fastest_option: fastest_closed.cloned(),
        });
    }

    info!(
        cheapest_code = cheapest_open.code(),
        fastest_code = fastest_open.and_then(DeliveryOption::code),
        "Returning the standard results"
    );
    Ok(SelectionResult {
        cheapest_delivery_option: Some(cheapest_open.clone()),
        alternative_cheapest_option: alternative_cheapest.cloned(),
        fastest_delivery_option: fastest_open.cloned(),
        alternative_fastest_option: alternative_fastest.cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hours::tests::{day_shift, local, round_the_clock};
    use crate::models::{DeliveryQuote, FulfilledPharmacy, PharmacySource};
    use serde_json::Map;

    /// Opens 20:00 and closes 23:00 local time
    fn evening_shift() -> PharmacySource {
        PharmacySource {
            code: Some("evening".to_string()),
            opening_hours: "Пн-Вс: 20:00-23:00".to_string(),
            opens_at: Some("2024-10-21T15:00:00Z".to_string()),
            closes_at: Some("2024-10-21T18:00:00Z".to_string()),
            ..PharmacySource::default()
        }
    }

    fn option(code: &str, mut source: PharmacySource, total_price: f64, eta: f64) -> DeliveryOption {
        source.code = Some(code.to_string());
        DeliveryOption {
            pharmacy: FulfilledPharmacy {
                source,
                products: Vec::new(),
                total_sum: total_price,
                replacements_needed: 1,
                replaced_skus: Vec::new(),
            },
            total_price,
            delivery_option: DeliveryQuote {
                price: 0.0,
                eta,
                extra: Map::new(),
            },
        }
    }

    fn code(slot: &Option<DeliveryOption>) -> Option<&str> {
        slot.as_ref().and_then(DeliveryOption::code)
    }

    #[test]
    fn empty_input_signals_no_delivery_options() {
        let err = select_best(&[], local(12, 0, 0)).unwrap_err();
        assert!(matches!(err, AppError::NoDeliveryOptions));
    }

    #[test]
    fn picks_cheapest_and_fastest_open_first_seen_on_ties() {
        let options = vec![
            option("a", round_the_clock(), 1200.0, 30.0),
            option("b", round_the_clock(), 1000.0, 45.0),
            option("c", round_the_clock(), 1000.0, 30.0),
        ];

        let result = select_best(&options, local(12, 0, 0)).expect("selection");

        assert_eq!(code(&result.cheapest_delivery_option), Some("b"));
        assert_eq!(code(&result.fastest_delivery_option), Some("a"));
        assert!(result.alternative_cheapest_option.is_none());
        assert!(result.alternative_fastest_option.is_none());
    }

    #[test]
    fn closing_soon_champion_gets_stays_open_alternative() {
        let now = local(18, 30, 0);
        let options = vec![
            option("closing", day_shift(), 900.0, 20.0),
            option("steady", round_the_clock(), 1100.0, 40.0),
            option("steady_dear", round_the_clock(), 1300.0, 50.0),
        ];

        let result = select_best(&options, now).expect("selection");

        assert_eq!(code(&result.cheapest_delivery_option), Some("closing"));
        assert_eq!(code(&result.alternative_cheapest_option), Some("steady"));
        assert_eq!(code(&result.fastest_delivery_option), Some("closing"));
        assert_eq!(code(&result.alternative_fastest_option), Some("steady"));
    }

    #[test]
    fn alternative_is_cleared_when_a_steady_option_takes_the_lead() {
        let now = local(18, 30, 0);
        let options = vec![
            option("closing", day_shift(), 900.0, 20.0),
            option("steady", round_the_clock(), 800.0, 40.0),
        ];

        let result = select_best(&options, now).expect("selection");

        assert_eq!(code(&result.cheapest_delivery_option), Some("steady"));
        assert!(result.alternative_cheapest_option.is_none());
        assert_eq!(code(&result.fastest_delivery_option), Some("closing"));
        assert_eq!(code(&result.alternative_fastest_option), Some("steady"));
    }

    #[test]
    fn closed_pharmacy_needs_thirty_percent_discount() {
        let now = local(12, 0, 0);

        let qualifying = vec![
            option("open", round_the_clock(), 1000.0, 30.0),
            option("closed", evening_shift(), 700.0, 30.0),
        ];
        let result = select_best(&qualifying, now).expect("selection");
        assert_eq!(code(&result.cheapest_delivery_option), Some("open"));
        assert_eq!(code(&result.alternative_cheapest_option), Some("closed"));
        assert!(result.alternative_fastest_option.is_none());

        let not_enough = vec![
            option("open", round_the_clock(), 1000.0, 30.0),
            option("closed", evening_shift(), 701.0, 30.0),
        ];
        let result = select_best(&not_enough, now).expect("selection");
        assert!(result.alternative_cheapest_option.is_none());
    }

    #[test]
    fn closed_discount_overrides_closing_soon_alternative() {
        let now = local(18, 30, 0);
        let options = vec![
            option("closing", day_shift(), 1000.0, 40.0),
            option("steady", round_the_clock(), 1200.0, 60.0),
            option("closed", evening_shift(), 650.0, 20.0),
        ];

        let result = select_best(&options, now).expect("selection");

        assert_eq!(code(&result.cheapest_delivery_option), Some("closing"));
        assert_eq!(code(&result.alternative_cheapest_option), Some("closed"));
        assert_eq!(code(&result.fastest_delivery_option), Some("closing"));
        assert_eq!(code(&result.alternative_fastest_option), Some("closed"));
    }

    #[test]
    fn faster_closed_pharmacy_alone_keeps_closing_soon_alternatives() {
        // Only the fastest criterion clears the margin, so the standard
        // result (with its stays-open alternatives) is returned
        let now = local(18, 30, 0);
        let options = vec![
            option("closing", day_shift(), 1000.0, 40.0),
            option("steady", round_the_clock(), 1200.0, 60.0),
            option("closed", evening_shift(), 900.0, 10.0),
        ];

        let result = select_best(&options, now).expect("selection");

        assert_eq!(code(&result.cheapest_delivery_option), Some("closing"));
        assert_eq!(code(&result.alternative_cheapest_option), Some("steady"));
        assert_eq!(code(&result.fastest_delivery_option), Some("closing"));
        assert_eq!(code(&result.alternative_fastest_option), Some("steady"));
    }

    #[test]
    fn cheaper_closed_pharmacy_drops_the_fastest_alternative() {
        let now = local(18, 30, 0);
        let options = vec![
            option("closing", day_shift(), 1000.0, 40.0),
            option("steady", round_the_clock(), 1200.0, 60.0),
            option("closed", evening_shift(), 600.0, 39.0),
        ];

        let result = select_best(&options, now).expect("selection");

        assert_eq!(code(&result.cheapest_delivery_option), Some("closing"));
        assert_eq!(code(&result.alternative_cheapest_option), Some("closed"));
        assert_eq!(code(&result.fastest_delivery_option), Some("closing"));
        assert!(result.alternative_fastest_option.is_none());
    }

    #[test]
    fn options_without_code_are_ignored() {
        let mut nameless = option("x", round_the_clock(), 10.0, 5.0);
        nameless.pharmacy.source.code = None;
        let options = vec![nameless, option("real", round_the_clock(), 500.0, 30.0)];

        let result = select_best(&options, local(12, 0, 0)).expect("selection");
        assert_eq!(code(&result.cheapest_delivery_option), Some("real"));
        assert_eq!(code(&result.fastest_delivery_option), Some("real"));
    }

    #[test]
    fn everything_closed_is_reported() {
        let options = vec![option("closed", evening_shift(), 700.0, 30.0)];
        let err = select_best(&options, local(12, 0, 0)).unwrap_err();
        assert!(matches!(err, AppError::NoOpenPharmacies));
    }
}
