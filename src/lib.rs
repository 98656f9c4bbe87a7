pub mod cmd;
pub mod config;
pub mod context;
pub mod engine;
pub mod events;
pub mod filters;
pub mod invoice;
pub mod load;
pub mod money;
pub mod output;
pub mod period;
pub mod rulebook;
pub mod rules;
pub mod validation;

// Flat public surface for the domain types and the pipeline.
pub use config::{Config, ConfigError, InvoiceFormat};
pub use context::{BillingContext, ContextValue};
pub use engine::{assemble_invoices, Engine, PassReport};
pub use events::{Event, Flight, SimpleEvent};
pub use filters::Filter;
pub use invoice::{ChargeLine, Invoice};
pub use load::{InputError, Metadata};
pub use period::Period;
pub use rules::{
    AllRules, CappedRule, DebugRule, FirstRule, FlightRule, MinimumDurationRule, Pricer, Rule,
    SetDateRule, SetLedgerYearRule, SimpleRule,
};
pub use validation::{validate_events, ValidationSummary};
