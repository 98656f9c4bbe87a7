use clap::{Parser, Subcommand};
use lentolasku::cmd::{run::RunCommand, schema::SchemaCommand, validate::ValidateCommand};

#[derive(Parser, Debug)]
#[command(name = "lentolasku", version, about = "Batch billing for a gliding club")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one full billing pass and write the outputs
    Run(RunCommand),
    /// Check account ids in the input events, write nothing
    Validate(ValidateCommand),
    /// Print the configuration file JSON schema
    Schema(SchemaCommand),
}

impl Command {
    fn exec(&self) -> anyhow::Result<()> {
        match self {
            Command::Run(run) => run.exec(),
            Command::Validate(validate) => validate.exec(),
            Command::Schema(schema) => schema.exec(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    cli.command.exec()
}
