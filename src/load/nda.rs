use super::InputError;
use crate::events::{Event, SimpleEvent};
use crate::period::Period;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::Path;

// Fixed-width record layout. `T00` opens an account statement and carries
// the IBAN; `T10` is one booked transaction. Other record types (balances,
// summaries) are skipped.
//
//   T00: 0..3 type, 3..21 IBAN
//   T10: 0..3 type, 3..9 ledger date YYMMDD, 9..15 value date,
//        15..21 payment date, 21..22 sign, 22..40 amount in cents,
//        40..75 counterparty name, 75..95 payer reference, 95.. message
const IBAN: std::ops::Range<usize> = 3..21;
const LEDGER_DATE: std::ops::Range<usize> = 3..9;
const SIGN: std::ops::Range<usize> = 21..22;
const CENTS: std::ops::Range<usize> = 22..40;
const NAME: std::ops::Range<usize> = 40..75;
const REFERENCE: std::ops::Range<usize> = 75..95;
const MESSAGE_START: usize = 95;

/// One booked bank transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Own account the statement belongs to.
    pub iban: String,
    pub ledger_date: NaiveDate,
    /// Signed amount in cents; positive is incoming money.
    pub cents: i64,
    pub name: String,
    /// Payer reference with leading zeros stripped; empty when absent.
    pub reference: String,
    pub message: String,
}

// Offsets are character positions; names may carry non-ASCII letters.
fn slice(chars: &[char], range: std::ops::Range<usize>) -> Option<String> {
    chars.get(range).map(|field| field.iter().collect())
}

fn parse_transaction(line: &str, iban: &str) -> Option<Transaction> {
    let chars: Vec<char> = line.chars().collect();
    let raw_date = slice(&chars, LEDGER_DATE)?;
    let ledger_date = NaiveDate::parse_from_str(&raw_date, "%y%m%d").ok()?;
    let sign = slice(&chars, SIGN)?;
    let magnitude: i64 = slice(&chars, CENTS)?.trim().parse().ok()?;
    let cents = match sign.as_str() {
        "-" => -magnitude,
        "+" => magnitude,
        _ => return None,
    };
    let name = slice(&chars, NAME)?.trim().to_string();
    let reference = slice(&chars, REFERENCE)?
        .trim()
        .trim_start_matches('0')
        .to_string();
    let message = chars
        .get(MESSAGE_START..)
        .map(|rest| rest.iter().collect::<String>())
        .unwrap_or_default()
        .trim()
        .to_string();
    Some(Transaction {
        iban: iban.to_string(),
        ledger_date,
        cents,
        name,
        reference,
        message,
    })
}

/// Parse every transaction record of an NDA file.
pub fn read_transactions(path: &Path) -> Result<Vec<Transaction>, InputError> {
    let text = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut transactions = Vec::new();
    let mut current_iban: Option<String> = None;

    for (index, line) in text.lines().enumerate() {
        let row = index as u64 + 1;
        match line.get(0..3) {
            Some("T00") => {
                let chars: Vec<char> = line.chars().collect();
                let iban = slice(&chars, IBAN)
                    .map(|iban| iban.trim().to_string())
                    .filter(|iban| !iban.is_empty())
                    .ok_or_else(|| InputError::row(path, row, "account header without IBAN"))?;
                current_iban = Some(iban);
            }
            Some("T10") => {
                let iban = current_iban
                    .as_deref()
                    .ok_or_else(|| InputError::row(path, row, "transaction before account header"))?;
                let transaction = parse_transaction(line, iban)
                    .ok_or_else(|| InputError::row(path, row, "malformed transaction record"))?;
                transactions.push(transaction);
            }
            _ => {}
        }
    }
    log::debug!(
        "Read {} bank transactions from {}",
        transactions.len(),
        path.display()
    );
    Ok(transactions)
}

/// Lift incoming member payments into billing events.
///
/// A transaction qualifies when the money is incoming, the payer reference
/// looks like an account id (length 4 or 6), the statement account is one
/// of `bank_ibans` (empty accepts all) and the ledger date falls inside the
/// optional period. The amount is NEGATED: incoming money reduces debt.
pub fn lift_incoming(
    transactions: &[Transaction],
    bank_ibans: &[String],
    period: Option<&Period>,
) -> Vec<Event> {
    transactions
        .iter()
        .filter(|txn| txn.cents > 0)
        .filter(|txn| matches!(txn.reference.len(), 4 | 6))
        .filter(|txn| bank_ibans.is_empty() || bank_ibans.iter().any(|iban| *iban == txn.iban))
        .filter(|txn| period.is_none_or(|p| p.contains(txn.ledger_date)))
        .map(|txn| {
            let item = if txn.name.is_empty() {
                "Pankkisuoritus".to_string()
            } else {
                txn.name.clone()
            };
            Event::Simple(SimpleEvent {
                id: 0,
                account_id: txn.reference.clone(),
                date: txn.ledger_date,
                item,
                amount: -Decimal::new(txn.cents, 2),
                ledger_account_id: None,
                ledger_year: None,
                rollup: false,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::path::PathBuf;

    const CLUB_IBAN: &str = "FI2413093000112458";

    fn t00(iban: &str) -> String {
        format!("T00{:<18}", iban)
    }

    fn t10(date: &str, sign: char, cents: u64, name: &str, reference: &str) -> String {
        format!(
            "T10{date}{date}{date}{sign}{cents:018}{name:<35}{reference:0>20}maksu",
            date = date,
            sign = sign,
            cents = cents,
            name = name,
            reference = reference,
        )
    }

    fn write_nda(tag: &str, lines: &[String]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "lentolasku-nda-{}-{}.nda",
            tag,
            std::process::id()
        ));
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[test]
    fn parses_transactions_under_account_header() {
        let path = write_nda(
            "basic",
            &[
                t00(CLUB_IBAN),
                t10("240615", '+', 4000, "MEIKÄLÄINEN MATTI", "1001"),
                "T80 summary record, skipped".to_string(),
                t10("240616", '-', 1250, "PANKKI OYJ", ""),
            ],
        );
        let transactions = read_transactions(&path).unwrap();
        assert_eq!(transactions.len(), 2);

        let first = &transactions[0];
        assert_eq!(first.iban, CLUB_IBAN);
        assert_eq!(
            first.ledger_date,
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
        );
        assert_eq!(first.cents, 4000);
        assert_eq!(first.name, "MEIKÄLÄINEN MATTI");
        assert_eq!(first.reference, "1001");
        assert_eq!(first.message, "maksu");

        assert_eq!(transactions[1].cents, -1250);
        assert_eq!(transactions[1].reference, "");
    }

    #[test]
    fn transaction_before_header_is_fatal() {
        let path = write_nda(
            "noheader",
            &[t10("240615", '+', 4000, "MATTI", "1001")],
        );
        assert!(matches!(
            read_transactions(&path),
            Err(InputError::Row { row: 1, .. })
        ));
    }

    #[test]
    fn malformed_record_reports_its_row() {
        let path = write_nda(
            "short",
            &[t00(CLUB_IBAN), "T10too short".to_string()],
        );
        assert!(matches!(
            read_transactions(&path),
            Err(InputError::Row { row: 2, .. })
        ));
    }

    #[test]
    fn lift_negates_incoming_payments() {
        let path = write_nda(
            "lift",
            &[
                t00(CLUB_IBAN),
                t10("240615", '+', 4000, "MATTI", "1001"),
                // outgoing, wrong-length reference, no reference: all skipped
                t10("240616", '-', 1250, "PANKKI", "1001"),
                t10("240617", '+', 5000, "LIISA", "12345"),
                t10("240618", '+', 5000, "PENTTI", ""),
                t10("240619", '+', 7550, "KERTTU", "123456"),
            ],
        );
        let transactions = read_transactions(&path).unwrap();
        let events = lift_incoming(&transactions, &[CLUB_IBAN.to_string()], None);

        assert_eq!(events.len(), 2);
        let Event::Simple(first) = &events[0] else {
            panic!("expected simple event");
        };
        assert_eq!(first.account_id, "1001");
        assert_eq!(first.amount, dec!(-40.00));
        assert_eq!(first.item, "MATTI");
        assert!(!first.rollup);

        let Event::Simple(second) = &events[1] else {
            panic!("expected simple event");
        };
        assert_eq!(second.account_id, "123456");
        assert_eq!(second.amount, dec!(-75.50));
    }

    #[test]
    fn lift_filters_on_iban_and_period() {
        let path = write_nda(
            "filters",
            &[
                t00("FI0000000000000000"),
                t10("240615", '+', 4000, "MATTI", "1001"),
            ],
        );
        let transactions = read_transactions(&path).unwrap();
        assert!(lift_incoming(&transactions, &[CLUB_IBAN.to_string()], None).is_empty());
        assert_eq!(lift_incoming(&transactions, &[], None).len(), 1);

        let period = Period::new(
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );
        assert!(lift_incoming(&transactions, &[], Some(&period)).is_empty());
    }

    #[test]
    fn reference_keeps_leading_zero_stripped_form() {
        let line = t10("240615", '+', 100, "X", "001001");
        // the reference field zero-pads to 20; stripping returns the short id
        let txn = parse_transaction(&line, CLUB_IBAN).unwrap();
        assert_eq!(txn.reference, "1001");
    }
}
