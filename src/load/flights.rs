use super::InputError;
use crate::events::{Event, Flight};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

/// Purpose code marking a positioning tow rather than a member flight.
const TRANSFER_TOW_PURPOSE: &str = "SII";

/// One row of the flight-office CSV export. The registration is the first
/// whitespace-separated token of `Selite`.
#[derive(Debug, Deserialize)]
struct FlightRecord {
    #[serde(rename = "Selite")]
    selite: String,
    #[serde(rename = "Tapahtumapäivä")]
    date: String,
    #[serde(rename = "Maksajan viitenumero")]
    account_id: String,
    #[serde(rename = "Lähtöaika")]
    departure_time: String,
    #[serde(rename = "Laskeutumisaika")]
    landing_time: String,
    #[serde(rename = "Lentoaika_desimaalinen")]
    decimal_hours: String,
    #[serde(rename = "Tarkoitus", default)]
    purpose: Option<String>,
    #[serde(rename = "Laskutuslisä syy", default)]
    invoicing_comment: Option<String>,
}

impl FlightRecord {
    fn into_flight(self, path: &Path, row: u64) -> Result<Flight, InputError> {
        let aircraft = self
            .selite
            .split_whitespace()
            .next()
            .map(str::to_uppercase)
            .ok_or_else(|| InputError::row(path, row, "empty aircraft registration"))?;

        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").map_err(|_| {
            InputError::row(path, row, format!("unparsable date {:?}", self.date))
        })?;

        let account_id = self.account_id.trim().to_string();
        if account_id.is_empty() {
            return Err(InputError::row(path, row, "empty account id"));
        }

        parse_time(&self.departure_time)
            .ok_or_else(|| {
                InputError::row(
                    path,
                    row,
                    format!("unparsable departure time {:?}", self.departure_time),
                )
            })?;
        parse_time(&self.landing_time).ok_or_else(|| {
            InputError::row(
                path,
                row,
                format!("unparsable landing time {:?}", self.landing_time),
            )
        })?;

        let hours = Decimal::from_str(self.decimal_hours.trim()).map_err(|_| {
            InputError::row(
                path,
                row,
                format!("unparsable flight time {:?}", self.decimal_hours),
            )
        })?;
        if hours < Decimal::ZERO {
            return Err(InputError::row(path, row, "negative flight time"));
        }

        let purpose = self
            .purpose
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        let transfer_tow = purpose.as_deref() == Some(TRANSFER_TOW_PURPOSE);
        let invoicing_comment = self
            .invoicing_comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(Flight {
            id: 0,
            account_id,
            date,
            aircraft,
            duration: hours * dec!(60),
            purpose,
            transfer_tow,
            invoicing_comment,
        })
    }
}

/// `HH:MM`, with a period accepted in place of the colon.
fn parse_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(&text.trim().replace('.', ":"), "%H:%M").ok()
}

pub fn read_flights(path: &Path) -> Result<Vec<Event>, InputError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| InputError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    let mut events = Vec::new();
    for (index, result) in reader.deserialize().enumerate() {
        // line 1 is the header
        let row = index as u64 + 2;
        let record: FlightRecord = result.map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        events.push(Event::Flight(record.into_flight(path, row)?));
    }
    log::debug!("Read {} flights from {}", events.len(), path.display());
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const HEADER: &str = "Selite,Tapahtumapäivä,Maksajan viitenumero,Lähtöaika,Laskeutumisaika,Lentoaika_desimaalinen,Tarkoitus,Laskutuslisä syy";

    fn write_csv(tag: &str, rows: &[&str]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "lentolasku-flights-{}-{}.csv",
            tag,
            std::process::id()
        ));
        let mut content = String::from(HEADER);
        for row in rows {
            content.push('\n');
            content.push_str(row);
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn reads_a_flight_row() {
        let path = write_csv(
            "basic",
            &["650 harjoitus,2024-06-15,1001,12:00,13:00,1.0,KOU,"],
        );
        let events = read_flights(&path).unwrap();
        assert_eq!(events.len(), 1);
        let Event::Flight(flight) = &events[0] else {
            panic!("expected flight");
        };
        assert_eq!(flight.aircraft, "650");
        assert_eq!(flight.account_id, "1001");
        assert_eq!(flight.duration, Decimal::from_str("60.0").unwrap());
        assert_eq!(flight.purpose.as_deref(), Some("KOU"));
        assert!(!flight.transfer_tow);
        assert!(flight.invoicing_comment.is_none());
    }

    #[test]
    fn registration_is_first_token_upper_cased() {
        let path = write_csv("token", &["tow siirto KOSKI,2024-06-15,1001,08:30,08:45,0.25,SII,"]);
        let events = read_flights(&path).unwrap();
        let Event::Flight(flight) = &events[0] else {
            panic!("expected flight");
        };
        assert_eq!(flight.aircraft, "TOW");
        assert_eq!(flight.duration, Decimal::from_str("15.00").unwrap());
        assert!(flight.transfer_tow);
    }

    #[test]
    fn period_time_separator_is_accepted() {
        let path = write_csv("times", &["650,2024-06-15,1001,12.00,13.30,1.5,,"]);
        let events = read_flights(&path).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn invoicing_comment_is_kept_when_present() {
        let path = write_csv(
            "comment",
            &["650,2024-06-15,1001,12:00,13:00,1.0,,katkennut vaijeri"],
        );
        let events = read_flights(&path).unwrap();
        let Event::Flight(flight) = &events[0] else {
            panic!("expected flight");
        };
        assert_eq!(flight.invoicing_comment.as_deref(), Some("katkennut vaijeri"));
    }

    #[test]
    fn bad_date_reports_file_and_row() {
        let path = write_csv("baddate", &["650,15.6.2024,1001,12:00,13:00,1.0,,"]);
        match read_flights(&path) {
            Err(InputError::Row { row, message, .. }) => {
                assert_eq!(row, 2);
                assert!(message.contains("date"));
            }
            other => panic!("expected row error, got {:?}", other),
        }
    }

    #[test]
    fn bad_time_is_fatal() {
        let path = write_csv("badtime", &["650,2024-06-15,1001,25:99,13:00,1.0,,"]);
        assert!(matches!(read_flights(&path), Err(InputError::Row { .. })));
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let path = std::env::temp_dir().join(format!(
            "lentolasku-flights-misscol-{}.csv",
            std::process::id()
        ));
        std::fs::write(&path, "Selite,Tapahtumapäivä\n650,2024-06-15\n").unwrap();
        assert!(matches!(read_flights(&path), Err(InputError::Csv { .. })));
    }
}
