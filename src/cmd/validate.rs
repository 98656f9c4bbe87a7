//! Validate command - surface bad account ids without writing anything

use crate::cmd::print_validation_summary;
use crate::config::Config;
use crate::load;
use crate::validation;
use clap::Args;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Billing configuration file (JSON)
    config: PathBuf,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let config = Config::load(&self.config)?;
        let events = load::load_events(&config)?;
        let known_ids = load::read_known_ids(&config.valid_id_files)?;
        let external_ids: HashSet<String> =
            config.no_invoicing_prefix.iter().cloned().collect();

        let summary = validation::validate_events(&events, &known_ids, &external_ids);
        if print_validation_summary(&summary) {
            std::process::exit(1);
        }
        println!("{} events, all account ids known", events.len());
        Ok(())
    }
}
