//! Run command - one full billing pass from a configuration file

use crate::cmd::print_validation_summary;
use crate::config::Config;
use crate::engine::{assemble_invoices, Engine, PassReport};
use crate::invoice::Invoice;
use crate::load;
use crate::money::display_eur;
use crate::output;
use crate::rulebook;
use crate::validation;
use clap::Args;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::path::PathBuf;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct RunCommand {
    /// Billing configuration file (JSON)
    config: PathBuf,
}

impl RunCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let config = Config::load(&self.config)?;
        let mut ctx = load::load_context(&config)?;
        let metadata = load::load_metadata(&config)?;
        let events = load::load_events(&config)?;

        let known_ids = load::read_known_ids(&config.valid_id_files)?;
        let external_ids: HashSet<String> =
            config.no_invoicing_prefix.iter().cloned().collect();
        let summary = validation::validate_events(&events, &known_ids, &external_ids);
        print_validation_summary(&summary);

        let engine = Engine::new(
            rulebook::rules_2024(&metadata),
            config.no_invoicing_prefix.clone(),
        );
        let (lines, report) = engine.run(&events, &mut ctx);
        let invoices = assemble_invoices(lines, config.invoice_date);

        let (billable, zero) = output::write_outputs(&invoices, &config)?;
        output::save_context(&ctx, &config)?;
        print_run_summary(&billable, &zero, &report);
        Ok(())
    }
}

#[derive(Debug, Tabled)]
struct SummaryRow {
    #[tabled(rename = "")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn print_run_summary(billable: &[&Invoice], zero: &[&Invoice], report: &PassReport) {
    let owed_to_club: Decimal = billable
        .iter()
        .map(|invoice| invoice.total())
        .filter(|total| *total > Decimal::ZERO)
        .sum();
    let owed_by_club: Decimal = billable
        .iter()
        .map(|invoice| invoice.total())
        .filter(|total| *total < Decimal::ZERO)
        .sum();
    let difference: Decimal = billable.iter().map(|invoice| invoice.total()).sum();

    let rows = vec![
        SummaryRow {
            metric: "Invoices written",
            value: billable.len().to_string(),
        },
        SummaryRow {
            metric: "Zero invoices",
            value: zero.len().to_string(),
        },
        SummaryRow {
            metric: "Owed to club",
            value: display_eur(owed_to_club),
        },
        SummaryRow {
            metric: "Owed by club",
            value: display_eur(owed_by_club),
        },
        SummaryRow {
            metric: "Difference",
            value: display_eur(difference),
        },
        SummaryRow {
            metric: "Skipped accounts",
            value: report.skipped_accounts.len().to_string(),
        },
        SummaryRow {
            metric: "Unmatched events",
            value: report.unmatched_event_ids.len().to_string(),
        },
    ];

    println!();
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}
