use crate::context::BillingContext;
use crate::events::{Event, Flight};
use crate::filters::{all_match, Filter};
use crate::invoice::ChargeLine;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// One node of the pricing rule tree.
///
/// A rule consumes an event and emits zero or more charge lines. "No match"
/// is the empty list, never an error. The tree is immutable after
/// construction; all mutable state lives in the `BillingContext`, passed
/// explicitly so that stateful rules (`CappedRule`, `SetDateRule`) and
/// context-reading filters share one store.
pub trait Rule {
    fn evaluate(&self, event: &Event, ctx: &mut BillingContext) -> Vec<ChargeLine>;
}

/// Hourly rate applied to the flight duration, or a function pricing the
/// whole line. Pricing functions must not fail; a panic there is a
/// configuration bug and aborts the run.
pub enum Pricer {
    Hourly(Decimal),
    PerLine(fn(&Flight) -> Decimal),
}

impl Pricer {
    fn amount(&self, flight: &Flight) -> Decimal {
        match self {
            Pricer::Hourly(rate) => flight.duration * *rate / dec!(60),
            Pricer::PerLine(price) => price(flight),
        }
    }
}

/// Default description for flight lines.
pub const DEFAULT_FLIGHT_TEMPLATE: &str = "Lento, {aircraft}, {duration} min";

/// Fill a description template from a flight.
///
/// Recognized substitutions: `{aircraft}`, `{duration}` (whole minutes,
/// truncated), `{purpose}`, `{invoicing_comment}`.
fn render_template(template: &str, flight: &Flight) -> String {
    template
        .replace("{aircraft}", &flight.aircraft)
        .replace("{duration}", &flight.duration.trunc().to_string())
        .replace("{purpose}", flight.purpose.as_deref().unwrap_or(""))
        .replace(
            "{invoicing_comment}",
            flight.invoicing_comment.as_deref().unwrap_or(""),
        )
}

/// Pass a matching simple event through as a single charge line.
///
/// The line carries the event's own amount, description and ledger fields;
/// the ledger category comes from the source data, not from the rule.
pub struct SimpleRule {
    filters: Vec<Filter>,
}

impl SimpleRule {
    pub fn new(filters: Vec<Filter>) -> Self {
        SimpleRule { filters }
    }
}

impl Rule for SimpleRule {
    fn evaluate(&self, event: &Event, ctx: &mut BillingContext) -> Vec<ChargeLine> {
        let Event::Simple(simple) = event else {
            return vec![];
        };
        if !all_match(&self.filters, event, ctx) {
            return vec![];
        }
        vec![ChargeLine {
            account_id: simple.account_id.clone(),
            date: simple.date,
            description: simple.item.clone(),
            amount: simple.amount,
            rule_ref: "SimpleRule".to_string(),
            source_event_id: simple.id,
            ledger_account_id: simple.ledger_account_id,
            ledger_year: simple.ledger_year,
            rollup: simple.rollup,
        }]
    }
}

/// Price a matching flight and emit one charge line on the given ledger
/// account.
pub struct FlightRule {
    pricer: Pricer,
    ledger_account_id: i32,
    filters: Vec<Filter>,
    template: String,
}

impl FlightRule {
    pub fn new(pricer: Pricer, ledger_account_id: i32, filters: Vec<Filter>) -> Self {
        Self::with_template(pricer, ledger_account_id, filters, DEFAULT_FLIGHT_TEMPLATE)
    }

    pub fn with_template(
        pricer: Pricer,
        ledger_account_id: i32,
        filters: Vec<Filter>,
        template: &str,
    ) -> Self {
        FlightRule {
            pricer,
            ledger_account_id,
            filters,
            template: template.to_string(),
        }
    }
}

impl Rule for FlightRule {
    fn evaluate(&self, event: &Event, ctx: &mut BillingContext) -> Vec<ChargeLine> {
        let Event::Flight(flight) = event else {
            return vec![];
        };
        if !all_match(&self.filters, event, ctx) {
            return vec![];
        }
        vec![ChargeLine {
            account_id: flight.account_id.clone(),
            date: flight.date,
            description: render_template(&self.template, flight),
            amount: self.pricer.amount(flight),
            rule_ref: format!("FlightRule({})", self.ledger_account_id),
            source_event_id: flight.id,
            ledger_account_id: Some(self.ledger_account_id),
            ledger_year: None,
            rollup: false,
        }]
    }
}

/// Evaluate every inner rule in order and keep all emitted lines.
pub struct AllRules {
    rules: Vec<Box<dyn Rule>>,
}

impl AllRules {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        AllRules { rules }
    }
}

impl Rule for AllRules {
    fn evaluate(&self, event: &Event, ctx: &mut BillingContext) -> Vec<ChargeLine> {
        let mut result = Vec::new();
        for rule in &self.rules {
            let lines = rule.evaluate(event, ctx);
            if !lines.is_empty() {
                log::debug!(
                    "Rule {} produced {} lines for event {}",
                    lines[0].rule_ref,
                    lines.len(),
                    event
                );
            }
            result.extend(lines);
        }
        result
    }
}

/// Evaluate inner rules in order and return the lines of the first rule
/// that emits any. The primary discriminator for pricing tiers.
pub struct FirstRule {
    rules: Vec<Box<dyn Rule>>,
}

impl FirstRule {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        FirstRule { rules }
    }
}

impl Rule for FirstRule {
    fn evaluate(&self, event: &Event, ctx: &mut BillingContext) -> Vec<ChargeLine> {
        for rule in &self.rules {
            let lines = rule.evaluate(event, ctx);
            if !lines.is_empty() {
                return lines;
            }
        }
        vec![]
    }
}

/// Bill short flights on selected aircraft as if they lasted the minimum.
///
/// The inner rule sees a copy of the flight with the clamped duration; the
/// caller's event is never touched. Transfer tows are exempt.
pub struct MinimumDurationRule {
    inner: Box<dyn Rule>,
    aircraft_filters: Vec<Filter>,
    min_minutes: Decimal,
    suffix: String,
}

impl MinimumDurationRule {
    pub fn new(
        inner: Box<dyn Rule>,
        aircraft_filters: Vec<Filter>,
        min_minutes: Decimal,
        suffix: &str,
    ) -> Self {
        MinimumDurationRule {
            inner,
            aircraft_filters,
            min_minutes,
            suffix: suffix.to_string(),
        }
    }
}

impl Rule for MinimumDurationRule {
    fn evaluate(&self, event: &Event, ctx: &mut BillingContext) -> Vec<ChargeLine> {
        let Event::Flight(flight) = event else {
            return self.inner.evaluate(event, ctx);
        };
        let applies = self
            .aircraft_filters
            .iter()
            .any(|filter| filter.matches(event, ctx))
            && !flight.transfer_tow
            && flight.duration < self.min_minutes;
        if !applies {
            return self.inner.evaluate(event, ctx);
        }

        let mut clamped = flight.clone();
        clamped.duration = self.min_minutes;
        let mut lines = self.inner.evaluate(&Event::Flight(clamped), ctx);
        for line in &mut lines {
            line.description.push(' ');
            line.description.push_str(&self.suffix);
        }
        lines
    }
}

/// Stamp a fiscal year on every emitted line that has none yet.
pub struct SetLedgerYearRule {
    inner: Box<dyn Rule>,
    ledger_year: i32,
}

impl SetLedgerYearRule {
    pub fn new(inner: Box<dyn Rule>, ledger_year: i32) -> Self {
        SetLedgerYearRule { inner, ledger_year }
    }
}

impl Rule for SetLedgerYearRule {
    fn evaluate(&self, event: &Event, ctx: &mut BillingContext) -> Vec<ChargeLine> {
        let mut lines = self.inner.evaluate(event, ctx);
        for line in &mut lines {
            if line.ledger_year.is_none() {
                line.ledger_year = Some(self.ledger_year);
            }
        }
        lines
    }
}

/// Record the date of every emitted line in a context variable and pass
/// the lines through unchanged.
pub struct SetDateRule {
    variable_id: String,
    inner: Box<dyn Rule>,
}

impl SetDateRule {
    pub fn new(variable_id: &str, inner: Box<dyn Rule>) -> Self {
        SetDateRule {
            variable_id: variable_id.to_string(),
            inner,
        }
    }
}

impl Rule for SetDateRule {
    fn evaluate(&self, event: &Event, ctx: &mut BillingContext) -> Vec<ChargeLine> {
        let lines = self.inner.evaluate(event, ctx);
        for line in &lines {
            ctx.set_date(&line.account_id, &self.variable_id, line.date);
        }
        lines
    }
}

/// Cap the cumulative amount billed under a context variable.
///
/// Lines are processed in arrival order and the accumulator is updated
/// between lines, so ordering inside the inner rule matters. Once the
/// accumulator is at the cap, further lines are dropped or zeroed and the
/// accumulator no longer grows.
pub struct CappedRule {
    variable_id: String,
    cap: Decimal,
    inner: Box<dyn Rule>,
    drop_over_cap: bool,
    cap_description: String,
}

impl CappedRule {
    pub fn new(variable_id: &str, cap: Decimal, inner: Box<dyn Rule>) -> Self {
        CappedRule {
            variable_id: variable_id.to_string(),
            cap,
            inner,
            drop_over_cap: false,
            cap_description: "rajattu hintakattoon".to_string(),
        }
    }

    pub fn dropping_over_cap(mut self) -> Self {
        self.drop_over_cap = true;
        self
    }

    pub fn with_cap_description(mut self, description: &str) -> Self {
        self.cap_description = description.to_string();
        self
    }
}

impl Rule for CappedRule {
    fn evaluate(&self, event: &Event, ctx: &mut BillingContext) -> Vec<ChargeLine> {
        let lines = self.inner.evaluate(event, ctx);
        let mut result = Vec::with_capacity(lines.len());
        for mut line in lines {
            let accumulated = ctx.amount(&line.account_id, &self.variable_id);
            if accumulated >= self.cap {
                if self.drop_over_cap {
                    log::debug!(
                        "Dropping line '{}' ({}) - already at cap ({})",
                        line.description,
                        line.amount,
                        self.cap
                    );
                    continue;
                }
                log::debug!(
                    "Zeroing line '{}' ({}) - already at cap ({})",
                    line.description,
                    line.amount,
                    self.cap
                );
                line.amount = Decimal::ZERO;
                line.description = format!("{}, {}", line.description, self.cap_description);
            } else if accumulated + line.amount > self.cap {
                line.amount = self.cap - accumulated;
                line.description = format!("{}, {}", line.description, self.cap_description);
            }
            ctx.set_amount(
                &line.account_id,
                &self.variable_id,
                accumulated + line.amount,
            );
            result.push(line);
        }
        result
    }
}

/// Transparent wrapper that reports inner results without changing them.
pub struct DebugRule {
    inner: Box<dyn Rule>,
    should_log: fn(&Event, &[ChargeLine]) -> bool,
    log: fn(&Event, &[ChargeLine]),
}

impl DebugRule {
    pub fn new(inner: Box<dyn Rule>) -> Self {
        DebugRule {
            inner,
            should_log: |_, lines| !lines.is_empty(),
            log: |event, lines| log::debug!("{} -> {} lines", event, lines.len()),
        }
    }

    pub fn with_hooks(
        inner: Box<dyn Rule>,
        should_log: fn(&Event, &[ChargeLine]) -> bool,
        log: fn(&Event, &[ChargeLine]),
    ) -> Self {
        DebugRule {
            inner,
            should_log,
            log,
        }
    }
}

impl Rule for DebugRule {
    fn evaluate(&self, event: &Event, ctx: &mut BillingContext) -> Vec<ChargeLine> {
        let lines = self.inner.evaluate(event, ctx);
        if (self.should_log)(event, &lines) {
            (self.log)(event, &lines);
        }
        lines
    }
}
