use crate::money::DISPLAY_EPSILON;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// One atomic billable item produced by a rule.
///
/// Immutable after emission, except `ledger_year`, which a wrapping
/// `SetLedgerYearRule` may stamp while the line is still inside the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeLine {
    pub account_id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    /// Identity of the producing rule, for diagnostics and export grouping.
    pub rule_ref: String,
    /// `Event::id` of the source event.
    pub source_event_id: usize,
    pub ledger_account_id: Option<i32>,
    pub ledger_year: Option<i32>,
    pub rollup: bool,
}

/// All charge lines of one account for the billing period.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub account_id: String,
    pub invoice_date: NaiveDate,
    /// Sorted by line date ascending, stable by emission order.
    pub lines: Vec<ChargeLine>,
}

impl Invoice {
    pub fn new(account_id: String, invoice_date: NaiveDate, lines: Vec<ChargeLine>) -> Self {
        Invoice {
            account_id,
            invoice_date,
            lines,
        }
    }

    pub fn total(&self) -> Decimal {
        self.lines.iter().map(|line| line.amount).sum()
    }

    /// Zero invoices are flagged for the summary but never removed.
    pub fn is_zero(&self) -> bool {
        self.total().abs() < DISPLAY_EPSILON
    }
}
