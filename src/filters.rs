use crate::context::BillingContext;
use crate::events::Event;
use crate::period::Period;
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};

const DAYS_PER_YEAR: Decimal = dec!(365.25);

/// Pure predicate over a single event.
///
/// Filters never fail: a predicate that cannot be evaluated (missing birth
/// date, uninitialized context slot) reads as "did not match". Each variant
/// has a stable `Display` form for diagnostics.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Event date inside the period.
    Period(Period),
    /// Flight with one of the given aircraft registrations.
    Aircraft(Vec<String>),
    /// Flight with one of the given purpose codes.
    Purpose(Vec<String>),
    /// Flight positioning the aircraft rather than serving a member.
    TransferTow,
    /// Flight carrying an invoicing comment.
    InvoicingCharge,
    /// Simple event whose item matches the regex.
    ItemRegex(Regex),
    /// Simple event with amount 0 or greater.
    PositiveAmount,
    /// Simple event with amount below 0.
    NegativeAmount,
    /// Pilot age at event date at most `max_age_years`.
    BirthDate {
        birth_dates: HashMap<String, NaiveDate>,
        max_age_years: u32,
    },
    /// Account membership in a fixed set, as whitelist or blacklist.
    MemberList {
        members: HashSet<String>,
        whitelist: bool,
    },
    /// Context date variable is set and not after the event date.
    SinceDate { variable_id: String },
    Not(Box<Filter>),
    Or(Vec<Filter>),
    IsFlight,
    IsSimpleEvent,
}

impl Filter {
    /// Flatten groups of filters into one `Or`, keeping every element of
    /// every group.
    pub fn any_of(groups: Vec<Vec<Filter>>) -> Filter {
        Filter::Or(groups.into_iter().flatten().collect())
    }

    pub fn matches(&self, event: &Event, ctx: &BillingContext) -> bool {
        match self {
            Filter::Period(period) => period.contains(event.date()),
            Filter::Aircraft(registrations) => match event {
                Event::Flight(flight) => registrations.iter().any(|r| *r == flight.aircraft),
                _ => false,
            },
            Filter::Purpose(purposes) => match event {
                Event::Flight(flight) => flight
                    .purpose
                    .as_ref()
                    .is_some_and(|p| purposes.iter().any(|candidate| candidate == p)),
                _ => false,
            },
            Filter::TransferTow => match event {
                Event::Flight(flight) => flight.transfer_tow,
                _ => false,
            },
            Filter::InvoicingCharge => match event {
                Event::Flight(flight) => flight
                    .invoicing_comment
                    .as_ref()
                    .is_some_and(|comment| !comment.is_empty()),
                _ => false,
            },
            Filter::ItemRegex(regex) => match event {
                Event::Simple(simple) => regex.is_match(&simple.item),
                _ => false,
            },
            Filter::PositiveAmount => match event {
                Event::Simple(simple) => simple.amount >= Decimal::ZERO,
                _ => false,
            },
            Filter::NegativeAmount => match event {
                Event::Simple(simple) => simple.amount < Decimal::ZERO,
                _ => false,
            },
            Filter::BirthDate {
                birth_dates,
                max_age_years,
            } => {
                let Some(birth_date) = birth_dates.get(event.account_id()) else {
                    log::warn!("No birth date found for account {}", event.account_id());
                    return false;
                };
                let days = Decimal::from((event.date() - *birth_date).num_days());
                days / DAYS_PER_YEAR <= Decimal::from(*max_age_years)
            }
            Filter::MemberList { members, whitelist } => {
                members.contains(event.account_id()) == *whitelist
            }
            Filter::SinceDate { variable_id } => {
                match ctx.date(event.account_id(), variable_id) {
                    Some(since) => since <= event.date(),
                    None => false,
                }
            }
            Filter::Not(inner) => !inner.matches(event, ctx),
            Filter::Or(inner) => inner.iter().any(|filter| filter.matches(event, ctx)),
            Filter::IsFlight => matches!(event, Event::Flight(_)),
            Filter::IsSimpleEvent => matches!(event, Event::Simple(_)),
        }
    }
}

/// True when every filter passes; the empty list is always satisfied.
pub fn all_match(filters: &[Filter], event: &Event, ctx: &BillingContext) -> bool {
    for filter in filters {
        if !filter.matches(event, ctx) {
            log::debug!("Filter failed: {} for event {}", filter, event);
            return false;
        }
    }
    true
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::Period(period) => write!(f, "Period({})", period),
            Filter::Aircraft(registrations) => {
                write!(f, "Aircraft({})", registrations.join(","))
            }
            Filter::Purpose(purposes) => write!(f, "Purpose({})", purposes.join(",")),
            Filter::TransferTow => write!(f, "TransferTow"),
            Filter::InvoicingCharge => write!(f, "InvoicingCharge"),
            Filter::ItemRegex(regex) => write!(f, "ItemRegex({})", regex.as_str()),
            Filter::PositiveAmount => write!(f, "PositiveAmount"),
            Filter::NegativeAmount => write!(f, "NegativeAmount"),
            Filter::BirthDate { max_age_years, .. } => {
                write!(f, "BirthDate(max_age={})", max_age_years)
            }
            Filter::MemberList { members, whitelist } => {
                let mode = if *whitelist { "whitelist" } else { "blacklist" };
                write!(f, "MemberList({},{} members)", mode, members.len())
            }
            Filter::SinceDate { variable_id } => write!(f, "SinceDate({})", variable_id),
            Filter::Not(inner) => write!(f, "NOT({})", inner),
            Filter::Or(inner) => {
                let parts: Vec<String> = inner.iter().map(|filter| filter.to_string()).collect();
                write!(f, "OR({})", parts.join(","))
            }
            Filter::IsFlight => write!(f, "IsFlight"),
            Filter::IsSimpleEvent => write!(f, "IsSimpleEvent"),
        }
    }
}
