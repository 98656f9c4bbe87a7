use crate::context::BillingContext;
use crate::events::Event;
use crate::invoice::{ChargeLine, Invoice};
use crate::rules::Rule;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Diagnostics collected during one engine pass.
///
/// Skipped and unmatched events are never errors; they are reported in the
/// run summary.
#[derive(Debug, Default)]
pub struct PassReport {
    /// Accounts skipped by a no-invoicing prefix before rule evaluation.
    pub skipped_accounts: BTreeSet<String>,
    /// Ids of events no rule produced a line for.
    pub unmatched_event_ids: Vec<usize>,
}

/// The single-pass billing engine.
///
/// Strictly single-threaded and deterministic: events are visited in input
/// order, top-level rules in registration order, and the context is the
/// only state mutated along the way.
pub struct Engine {
    rules: Vec<Box<dyn Rule>>,
    no_invoicing_prefixes: Vec<String>,
}

impl Engine {
    pub fn new(rules: Vec<Box<dyn Rule>>, no_invoicing_prefixes: Vec<String>) -> Self {
        Engine {
            rules,
            no_invoicing_prefixes,
        }
    }

    fn skip_account(&self, account_id: &str) -> bool {
        let canonical = account_id.to_uppercase();
        self.no_invoicing_prefixes
            .iter()
            .any(|prefix| canonical.starts_with(prefix))
    }

    /// Run every event through every top-level rule, collecting all
    /// emitted lines.
    pub fn run(&self, events: &[Event], ctx: &mut BillingContext) -> (Vec<ChargeLine>, PassReport) {
        let mut lines = Vec::new();
        let mut report = PassReport::default();

        for event in events {
            if self.skip_account(event.account_id()) {
                report
                    .skipped_accounts
                    .insert(event.account_id().to_string());
                continue;
            }

            let mut matched = false;
            for rule in &self.rules {
                let emitted = rule.evaluate(event, ctx);
                if !emitted.is_empty() {
                    matched = true;
                    lines.extend(emitted);
                }
            }
            if !matched {
                log::warn!("No match for event {}", event);
                report.unmatched_event_ids.push(event.id());
            }
        }

        if !report.skipped_accounts.is_empty() {
            log::info!(
                "Skipped accounts: {}",
                report
                    .skipped_accounts
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        (lines, report)
    }
}

/// Group charge lines into invoices, one per account, in ascending account
/// order. Lines are stable-sorted by date inside each invoice.
pub fn assemble_invoices(
    lines: Vec<ChargeLine>,
    invoice_date: NaiveDate,
) -> Vec<Invoice> {
    let mut by_account: BTreeMap<String, Vec<ChargeLine>> = BTreeMap::new();
    for line in lines {
        by_account.entry(line.account_id.clone()).or_default().push(line);
    }
    by_account
        .into_iter()
        .map(|(account_id, mut account_lines)| {
            account_lines.sort_by_key(|line| line.date);
            Invoice::new(account_id, invoice_date, account_lines)
        })
        .collect()
}
