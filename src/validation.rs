use crate::events::Event;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};

/// Outcome of validating the event stream against the known account ids.
///
/// Validation is diagnostic only: invalid events stay in the stream and the
/// engine still processes them.
#[derive(Debug, Default)]
pub struct ValidationSummary {
    /// Invalid event count per variant name.
    pub invalid_counts: BTreeMap<String, usize>,
    /// Sum of invalid amounts per variant name (simple events only).
    pub invalid_totals: BTreeMap<String, Decimal>,
}

impl ValidationSummary {
    pub fn total_invalid(&self) -> usize {
        self.invalid_counts.values().sum()
    }

    pub fn is_clean(&self) -> bool {
        self.total_invalid() == 0
    }
}

/// An account id is valid when it is a known id of length 4 or 6, or one of
/// the always-acceptable external identifiers.
pub fn account_id_valid(
    account_id: &str,
    known_ids: &HashSet<String>,
    external_ids: &HashSet<String>,
) -> bool {
    (known_ids.contains(account_id) && matches!(account_id.len(), 4 | 6))
        || external_ids.contains(account_id)
}

pub fn validate_events(
    events: &[Event],
    known_ids: &HashSet<String>,
    external_ids: &HashSet<String>,
) -> ValidationSummary {
    let mut summary = ValidationSummary::default();
    for event in events {
        if account_id_valid(event.account_id(), known_ids, external_ids) {
            continue;
        }
        log::warn!("Invalid account id {} in {}", event.account_id(), event);
        *summary
            .invalid_counts
            .entry(event.kind().to_string())
            .or_default() += 1;
        if let Event::Simple(simple) = event {
            *summary
                .invalid_totals
                .entry(event.kind().to_string())
                .or_default() += simple.amount;
        }
    }
    summary
}
