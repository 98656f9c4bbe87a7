//! Input adapters: CSV and bank-file loaders producing the event stream,
//! plus the id/birth-date/context side files.

pub mod flights;
pub mod nda;
pub mod simple;

use crate::config::{Config, ConfigError};
use crate::context::BillingContext;
use crate::events::Event;
use crate::period::Period;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Fatal problem in one input file; identifies the file and, where
/// applicable, the row.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },
    #[error("{path} row {row}: {message}")]
    Row {
        path: PathBuf,
        row: u64,
        message: String,
    },
}

impl InputError {
    pub fn row(path: &Path, row: u64, message: impl Into<String>) -> Self {
        InputError::Row {
            path: path.to_path_buf(),
            row,
            message: message.into(),
        }
    }
}

/// Accept `YYYY-MM-DD` or `DD.MM.YYYY`.
pub fn parse_flexible_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%d.%m.%Y"))
        .ok()
}

/// Known account ids, one per line; blanks and `#` comments ignored.
pub fn read_known_ids(paths: &[PathBuf]) -> Result<HashSet<String>, InputError> {
    let mut ids = HashSet::new();
    for path in paths {
        let text = std::fs::read_to_string(path).map_err(|source| InputError::Io {
            path: path.clone(),
            source,
        })?;
        ids.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    Ok(ids)
}

/// Member ids from CSV files, first column only; `#` comments ignored.
pub fn read_member_ids(paths: &[PathBuf]) -> Result<HashSet<String>, InputError> {
    let mut ids = HashSet::new();
    for path in paths {
        let mut reader = csv_reader(path)?;
        for record in reader.records() {
            let record = record.map_err(|source| InputError::Csv {
                path: path.clone(),
                source,
            })?;
            let Some(id) = record.get(0).map(str::trim) else {
                continue;
            };
            if !id.is_empty() && !id.starts_with('#') {
                ids.insert(id.to_string());
            }
        }
    }
    Ok(ids)
}

/// Birth dates from `account_id,date` CSV files.
pub fn read_birth_dates(
    paths: &[PathBuf],
) -> Result<HashMap<String, NaiveDate>, InputError> {
    let mut dates = HashMap::new();
    for path in paths {
        let mut reader = csv_reader(path)?;
        for record in reader.records() {
            let record = record.map_err(|source| InputError::Csv {
                path: path.clone(),
                source,
            })?;
            let row = record.position().map(|p| p.line()).unwrap_or(0);
            let Some(account_id) = record.get(0).map(str::trim) else {
                continue;
            };
            if account_id.is_empty() || account_id.starts_with('#') {
                continue;
            }
            let raw_date = record
                .get(1)
                .map(str::trim)
                .ok_or_else(|| InputError::row(path, row, "missing birth date column"))?;
            let date = parse_flexible_date(raw_date).ok_or_else(|| {
                InputError::row(path, row, format!("unparsable birth date {:?}", raw_date))
            })?;
            dates.insert(account_id.to_string(), date);
        }
    }
    Ok(dates)
}

fn csv_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, InputError> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

/// Side data feeding the discount filters.
#[derive(Debug, Default)]
pub struct Metadata {
    pub birth_dates: HashMap<String, NaiveDate>,
    pub course_members: HashSet<String>,
}

pub fn load_metadata(config: &Config) -> Result<Metadata, InputError> {
    Ok(Metadata {
        birth_dates: read_birth_dates(&config.birth_date_files)?,
        course_members: read_member_ids(&config.course_member_files)?,
    })
}

/// Billing context from the configured snapshot; a missing file starts an
/// empty context, a malformed one is fatal.
pub fn load_context(config: &Config) -> Result<BillingContext, ConfigError> {
    let Some(path) = config.context_file_in.as_ref() else {
        return Ok(BillingContext::new());
    };
    if !path.is_file() {
        return Ok(BillingContext::new());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    BillingContext::from_json(&text).map_err(|source| ConfigError::BadContext {
        path: path.clone(),
        source,
    })
}

/// Load every configured source, merge, sort by date (stable, so ties keep
/// input order), and number the events.
pub fn load_events(config: &Config) -> Result<Vec<Event>, InputError> {
    let mut events = Vec::new();
    for path in &config.event_files {
        events.extend(simple::read_simple_events(path)?);
    }
    for path in &config.flight_files {
        events.extend(flights::read_flights(path)?);
    }

    let bank_period = config
        .bank_txn_dates
        .map(|(start, end)| Period::new(start, end));
    for path in &config.nda_files {
        let transactions = nda::read_transactions(path)?;
        events.extend(nda::lift_incoming(
            &transactions,
            &config.bank_ibans,
            bank_period.as_ref(),
        ));
    }

    events.sort_by_key(|event| event.date());
    for (id, event) in events.iter_mut().enumerate() {
        event.set_id(id);
    }
    log::info!("Loaded {} events", events.len());
    Ok(events)
}
