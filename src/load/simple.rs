use super::{parse_flexible_date, InputError};
use crate::events::{Event, SimpleEvent};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

/// Positional columns of the manual-event CSV: date, account id, item,
/// amount, then optional ledger account id, ledger year and rollup flag.
pub fn read_simple_events(path: &Path) -> Result<Vec<Event>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut events = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = index as u64 + 1;
        let record = result.map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let first = record.get(0).map(str::trim).unwrap_or_default();
        if first.is_empty() || first.starts_with('#') {
            continue;
        }
        events.push(Event::Simple(parse_record(&record, path, row)?));
    }
    log::debug!("Read {} simple events from {}", events.len(), path.display());
    Ok(events)
}

fn parse_record(
    record: &csv::StringRecord,
    path: &Path,
    row: u64,
) -> Result<SimpleEvent, InputError> {
    let field = |index: usize| record.get(index).map(str::trim).unwrap_or_default();

    let date = parse_flexible_date(field(0))
        .ok_or_else(|| InputError::row(path, row, format!("unparsable date {:?}", field(0))))?;
    let account_id = field(1).to_string();
    if account_id.is_empty() {
        return Err(InputError::row(path, row, "empty account id"));
    }
    let item = field(2).to_string();
    let amount = parse_amount(field(3))
        .ok_or_else(|| InputError::row(path, row, format!("unparsable amount {:?}", field(3))))?;

    let ledger_account_id = parse_optional(field(4), |text| i32::from_str(text).ok())
        .map_err(|text| InputError::row(path, row, format!("bad ledger account {:?}", text)))?;
    let ledger_year = parse_optional(field(5), |text| i32::from_str(text).ok())
        .map_err(|text| InputError::row(path, row, format!("bad ledger year {:?}", text)))?;
    let rollup = matches!(
        field(6).to_lowercase().as_str(),
        "1" | "true" | "yes"
    );

    Ok(SimpleEvent {
        id: 0,
        account_id,
        date,
        item,
        amount,
        ledger_account_id,
        ledger_year,
        rollup,
    })
}

/// Amounts accept both `.` and `,` as the decimal separator.
fn parse_amount(text: &str) -> Option<Decimal> {
    Decimal::from_str(&text.replace(',', ".")).ok()
}

fn parse_optional<T>(
    text: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, String> {
    if text.is_empty() {
        return Ok(None);
    }
    parse(text).map(Some).ok_or_else(|| text.to_string())
}
