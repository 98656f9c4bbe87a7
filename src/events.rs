use chrono::NaiveDate;
use rust_decimal::Decimal;

/// A flight ready for billing.
///
/// `duration` is in minutes. `id` is the event's position in the
/// date-sorted input stream, assigned by the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct Flight {
    pub id: usize,
    pub account_id: String,
    pub date: NaiveDate,
    /// Aircraft registration token, stored upper-case.
    pub aircraft: String,
    pub duration: Decimal,
    pub purpose: Option<String>,
    pub transfer_tow: bool,
    /// Non-empty comment marks the flight for the invoicing surcharge.
    pub invoicing_comment: Option<String>,
}

/// A manual ledger item or a lifted bank transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleEvent {
    pub id: usize,
    pub account_id: String,
    pub date: NaiveDate,
    pub item: String,
    pub amount: Decimal,
    pub ledger_account_id: Option<i32>,
    pub ledger_year: Option<i32>,
    /// Aggregated at display, excluded from per-row ledger export.
    pub rollup: bool,
}

/// One billable event from any input source.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Flight(Flight),
    Simple(SimpleEvent),
}

impl Event {
    pub fn id(&self) -> usize {
        match self {
            Event::Flight(f) => f.id,
            Event::Simple(s) => s.id,
        }
    }

    pub fn account_id(&self) -> &str {
        match self {
            Event::Flight(f) => &f.account_id,
            Event::Simple(s) => &s.account_id,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Event::Flight(f) => f.date,
            Event::Simple(s) => s.date,
        }
    }

    /// Variant name for validation diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Flight(_) => "Flight",
            Event::Simple(_) => "SimpleEvent",
        }
    }

    pub fn set_id(&mut self, id: usize) {
        match self {
            Event::Flight(f) => f.id = id,
            Event::Simple(s) => s.id = id,
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Flight(flight) => write!(
                f,
                "Flight({}, {}, {}, {} min)",
                flight.account_id, flight.date, flight.aircraft, flight.duration
            ),
            Event::Simple(simple) => write!(
                f,
                "SimpleEvent({}, {}, {}, {})",
                simple.account_id, simple.date, simple.item, simple.amount
            ),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn common_accessors_reach_both_variants() {
        let f = flight("1001", "2024-06-15", "650", dec!(60));
        let s = simple("1002", "2024-03-01", "Vuosimaksu", dec!(120));
        assert_eq!(f.account_id(), "1001");
        assert_eq!(s.account_id(), "1002");
        assert_eq!(f.date(), date("2024-06-15"));
        assert_eq!(f.kind(), "Flight");
        assert_eq!(s.kind(), "SimpleEvent");
    }

    #[test]
    fn set_id_updates_the_variant() {
        let mut event = flight("1001", "2024-06-15", "650", dec!(60));
        event.set_id(7);
        assert_eq!(event.id(), 7);
    }
}
