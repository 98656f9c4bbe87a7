pub mod run;
pub mod schema;
pub mod validate;

use crate::money::display_eur;
use crate::validation::ValidationSummary;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Debug, Tabled)]
struct ValidationRow {
    #[tabled(rename = "Event type")]
    kind: String,
    #[tabled(rename = "Invalid")]
    count: usize,
    #[tabled(rename = "Amount")]
    total: String,
}

/// Render the invalid-event summary; returns true when anything was
/// invalid.
pub fn print_validation_summary(summary: &ValidationSummary) -> bool {
    if summary.is_clean() {
        log::info!("All events were accounted for.");
        return false;
    }

    let rows: Vec<ValidationRow> = summary
        .invalid_counts
        .iter()
        .map(|(kind, count)| ValidationRow {
            kind: kind.clone(),
            count: *count,
            total: summary
                .invalid_totals
                .get(kind)
                .map(|total| display_eur(*total))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    println!();
    println!("Invalid events: {}", summary.total_invalid());
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
    true
}
