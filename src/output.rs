use crate::config::{Config, ConfigError, InvoiceFormat};
use crate::context::BillingContext;
use crate::invoice::{ChargeLine, Invoice};
use crate::money::display_amount;
use anyhow::Context as _;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Render one invoice as the text sent to the member.
///
/// Rollup lines (carried-over balances) are aggregated into a single
/// display row; everything else is listed per line.
pub fn format_invoice(invoice: &Invoice, description: &str, format: InvoiceFormat) -> String {
    let date_format = match format {
        InvoiceFormat::Y2015 => "%d.%m.%Y",
        InvoiceFormat::Y2024 => "%Y-%m-%d",
    };

    let mut text = String::new();
    text.push_str(description);
    text.push_str("\n\n");
    text.push_str(&format!("Viitenumero: {}\n", invoice.account_id));
    text.push_str(&format!(
        "Päivämäärä: {}\n\n",
        invoice.invoice_date.format(date_format)
    ));

    let rollup_total: Decimal = invoice
        .lines
        .iter()
        .filter(|line| line.rollup)
        .map(|line| line.amount)
        .sum();
    if invoice.lines.iter().any(|line| line.rollup) {
        text.push_str(&format!(
            "{:<62} {:>10}\n",
            "Aiemmat tapahtumat yhteensä",
            display_amount(rollup_total)
        ));
    }
    for line in invoice.lines.iter().filter(|line| !line.rollup) {
        text.push_str(&format!(
            "{:<12}{:<50} {:>10}\n",
            line.date.format(date_format),
            line.description,
            display_amount(line.amount)
        ));
    }

    text.push_str(&format!(
        "\n{:<62} {:>10}\n",
        "Yhteensä",
        display_amount(invoice.total())
    ));
    text
}

#[derive(Debug, Serialize)]
struct TotalRow<'a> {
    account_id: &'a str,
    total: String,
}

#[derive(Debug, Serialize)]
struct LedgerRow<'a> {
    account_id: &'a str,
    date: String,
    description: &'a str,
    amount: String,
    ledger_account_id: Option<i32>,
}

fn write_csv<R: Serialize>(path: &Path, rows: impl IntoIterator<Item = R>) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("cannot write {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write all run outputs into the configured directory and split the
/// invoices into (billable, zero). The directory must not exist yet.
pub fn write_outputs<'a>(
    invoices: &'a [Invoice],
    config: &Config,
) -> anyhow::Result<(Vec<&'a Invoice>, Vec<&'a Invoice>)> {
    if config.out_dir.exists() {
        return Err(ConfigError::OutDirExists(config.out_dir.clone()).into());
    }
    std::fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("cannot create {}", config.out_dir.display()))?;

    let (billable, zero): (Vec<&Invoice>, Vec<&Invoice>) =
        invoices.iter().partition(|invoice| !invoice.is_zero());

    for invoice in &billable {
        let path = config.out_dir.join(format!("{}.txt", invoice.account_id));
        let text = format_invoice(invoice, &config.description, config.invoice_format);
        std::fs::write(&path, text)
            .with_context(|| format!("cannot write {}", path.display()))?;
    }

    write_csv(
        &config.out_dir.join(&config.total_csv_name),
        billable.iter().map(|invoice| TotalRow {
            account_id: &invoice.account_id,
            total: display_amount(invoice.total()),
        }),
    )?;

    let mut by_year: BTreeMap<i32, Vec<&ChargeLine>> = BTreeMap::new();
    for line in invoices
        .iter()
        .flat_map(|invoice| invoice.lines.iter())
        .filter(|line| !line.rollup)
    {
        match line.ledger_year {
            Some(year) => by_year.entry(year).or_default().push(line),
            None => log::warn!(
                "Line '{}' for {} has no ledger year, not exported",
                line.description,
                line.account_id
            ),
        }
    }
    for (year, lines) in &by_year {
        write_csv(
            &config.out_dir.join(config.row_csv_name(*year)),
            lines.iter().map(|line| LedgerRow {
                account_id: &line.account_id,
                date: line.date.format("%Y-%m-%d").to_string(),
                description: &line.description,
                amount: display_amount(line.amount),
                ledger_account_id: line.ledger_account_id,
            }),
        )?;
    }

    Ok((billable, zero))
}

/// Persist the final billing context when configured.
pub fn save_context(ctx: &BillingContext, config: &Config) -> anyhow::Result<()> {
    let Some(path) = config.context_file_out.as_ref() else {
        return Ok(());
    };
    let json = ctx.to_json()?;
    std::fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
    log::info!("Saved billing context to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::test_support::line;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn invoice() -> Invoice {
        let mut balance = line("1001", "2024-01-01", "Saldo 2023", dec!(12.00));
        balance.rollup = true;
        Invoice::new(
            "1001".to_string(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            vec![
                balance,
                line("1001", "2024-06-15", "Lento, 650, 60 min", dec!(18.00)),
                line("1001", "2024-07-01", "Suoritus", dec!(-10.00)),
            ],
        )
    }

    fn config(tag: &str) -> Config {
        let base = std::env::temp_dir().join(format!(
            "lentolasku-output-{}-{}",
            tag,
            std::process::id()
        ));
        serde_json::from_value(serde_json::json!({
            "invoice_date": "2024-12-31",
            "out_dir": base.join("out"),
            "description": "PIK laskutus 2024",
            "context_file_out": base.join("context.json"),
        }))
        .unwrap()
    }

    fn prepare(config: &Config) {
        if let Some(parent) = config.out_dir.parent() {
            let _ = std::fs::remove_dir_all(parent);
            std::fs::create_dir_all(parent).unwrap();
        }
    }

    #[test]
    fn invoice_text_lists_lines_and_total() {
        let text = format_invoice(&invoice(), "PIK laskutus 2024", InvoiceFormat::Y2015);
        assert!(text.starts_with("PIK laskutus 2024\n"));
        assert!(text.contains("Viitenumero: 1001"));
        assert!(text.contains("Päivämäärä: 31.12.2024"));
        assert!(text.contains("15.06.2024"));
        assert!(text.contains("Lento, 650, 60 min"));
        assert!(text.contains("18.00"));
        // rollup lines fold into one row
        assert!(text.contains("Aiemmat tapahtumat yhteensä"));
        assert!(!text.contains("Saldo 2023"));
        assert!(text.contains("Yhteensä"));
        assert!(text.contains("20.00"));
    }

    #[test]
    fn iso_format_uses_iso_dates() {
        let text = format_invoice(&invoice(), "PIK laskutus 2024", InvoiceFormat::Y2024);
        assert!(text.contains("Päivämäärä: 2024-12-31"));
        assert!(text.contains("2024-06-15"));
    }

    #[test]
    fn outputs_land_in_fresh_directory() {
        let mut invoices = vec![invoice()];
        let mut zero_line = line("1002", "2024-06-15", "Lento", dec!(5.00));
        zero_line.ledger_year = Some(2024);
        let mut credit = line("1002", "2024-07-01", "Suoritus", dec!(-5.00));
        credit.ledger_year = Some(2024);
        invoices.push(Invoice::new(
            "1002".to_string(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            vec![zero_line, credit],
        ));
        for line in invoices[0].lines.iter_mut() {
            line.ledger_year = Some(if line.rollup { 2023 } else { 2024 });
        }

        let config = config("basic");
        prepare(&config);
        let (billable, zero) = write_outputs(&invoices, &config).unwrap();
        assert_eq!(billable.len(), 1);
        assert_eq!(zero.len(), 1);

        // one text file per billable invoice only
        assert!(config.out_dir.join("1001.txt").is_file());
        assert!(!config.out_dir.join("1002.txt").exists());

        let totals = std::fs::read_to_string(config.out_dir.join("totals.csv")).unwrap();
        assert_eq!(totals.trim(), "1001,20.00");

        // zero-invoice lines still reach the ledger export; rollups do not
        let rows = std::fs::read_to_string(config.out_dir.join("rows_2024.csv")).unwrap();
        assert!(rows.contains("1001,2024-06-15,\"Lento, 650, 60 min\",18.00,"));
        assert!(rows.contains("1002,2024-06-15,Lento,5.00,"));
        assert!(!rows.contains("Saldo"));
        assert!(!config.out_dir.join("rows_2023.csv").exists());
    }

    #[test]
    fn existing_out_dir_is_fatal() {
        let config = config("existing");
        prepare(&config);
        std::fs::create_dir_all(&config.out_dir).unwrap();
        let invoices = vec![invoice()];
        let err = write_outputs(&invoices, &config).unwrap_err();
        assert!(err
            .downcast_ref::<ConfigError>()
            .is_some_and(|e| matches!(e, ConfigError::OutDirExists(_))));
    }

    #[test]
    fn context_snapshot_is_written_when_configured() {
        let config = config("context");
        prepare(&config);
        let mut ctx = BillingContext::new();
        ctx.set_amount("1001", "pursi_hintakatto_2024", dec!(90));
        save_context(&ctx, &config).unwrap();

        let path = config.context_file_out.as_ref().unwrap();
        let reloaded =
            BillingContext::from_json(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(reloaded, ctx);
    }
}
