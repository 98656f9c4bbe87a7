use rust_decimal::{Decimal, RoundingStrategy};

/// Smallest externally visible amount; invoices below this are zero.
pub const DISPLAY_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Narrow an amount to the two fractional digits shown on invoices and
/// exports. Intermediate arithmetic stays at full precision; only this
/// boundary rounds, half-up.
pub fn round_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount for invoice text and CSV export, e.g. "30.50".
pub fn display_amount(amount: Decimal) -> String {
    format!("{:.2}", round_display(amount))
}

/// Format an amount with the euro sign for log and summary output.
pub fn display_eur(amount: Decimal) -> String {
    format!("{} \u{20ac}", display_amount(amount))
}
