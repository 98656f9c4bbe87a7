use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One context slot: a running decimal accumulator or an ISO-8601 date.
///
/// The JSON snapshot stores both as strings; bare numbers are accepted on
/// input for hand-edited files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Amount(Decimal),
    Date(String),
}

/// Per-account, per-variable mutable state shared by the stateful rules.
///
/// Mutated only during a single engine pass; the JSON shape is
/// `{ account_id: { variable_id: value } }` and round-trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BillingContext {
    values: BTreeMap<String, BTreeMap<String, ContextValue>>,
}

impl BillingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn get(&self, account_id: &str, variable_id: &str) -> Option<&ContextValue> {
        self.values.get(account_id)?.get(variable_id)
    }

    /// Accumulator value; missing or non-numeric slots read as zero.
    pub fn amount(&self, account_id: &str, variable_id: &str) -> Decimal {
        match self.get(account_id, variable_id) {
            Some(ContextValue::Amount(amount)) => *amount,
            _ => Decimal::ZERO,
        }
    }

    /// Date value; missing or malformed slots read as `None`.
    pub fn date(&self, account_id: &str, variable_id: &str) -> Option<NaiveDate> {
        match self.get(account_id, variable_id) {
            Some(ContextValue::Date(text)) => {
                NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
            }
            _ => None,
        }
    }

    pub fn set_amount(&mut self, account_id: &str, variable_id: &str, amount: Decimal) {
        self.set(account_id, variable_id, ContextValue::Amount(amount));
    }

    pub fn set_date(&mut self, account_id: &str, variable_id: &str, date: NaiveDate) {
        self.set(
            account_id,
            variable_id,
            ContextValue::Date(date.format("%Y-%m-%d").to_string()),
        );
    }

    fn set(&mut self, account_id: &str, variable_id: &str, value: ContextValue) {
        self.values
            .entry(account_id.to_string())
            .or_default()
            .insert(variable_id.to_string(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
