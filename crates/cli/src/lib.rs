pub mod commands;

use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use clientele_core::config::{AppConfig, LoadOptions, LogFormat};
use clientele_db::CustomerSeedDataset;

use crate::commands::customer::CustomerFields;
use crate::commands::list::ListArgs;

#[derive(Debug, Parser)]
#[command(
    name = "clientele",
    about = "Clientele customer store CLI",
    long_about = "Manage the customer store: apply migrations, seed demo rows, page through \
                  customers and create, update or delete them.",
    after_help = "Examples:\n  clientele migrate\n  clientele seed --count 500\n  clientele list --page 2 --sort city --desc\n  clientele create --company-name \"Acme\" --phone \"+30 210 1234567\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Insert deterministic demo customers `Company 0001..N`")]
    Seed {
        #[arg(long, default_value_t = CustomerSeedDataset::DEFAULT_COUNT)]
        count: u32,
    },
    #[command(about = "List one page of customers in a chosen order")]
    List(ListArgs),
    #[command(about = "Show one customer")]
    Show { id: String },
    #[command(about = "Create a customer")]
    Create(CustomerFields),
    #[command(about = "Update the given fields of a customer")]
    Update {
        id: String,
        #[command(flatten)]
        fields: CustomerFields,
    },
    #[command(about = "Delete a customer")]
    Delete { id: String },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

/// Routes tracing output to stderr so stdout carries only command payloads.
/// Configuration errors are reported by the command itself.
fn init_logging() -> anyhow::Result<()> {
    let Ok(config) = AppConfig::load(LoadOptions::default()) else {
        return Ok(());
    };
    let filter = EnvFilter::try_new(&config.logging.level)
        .with_context(|| format!("invalid log level `{}`", config.logging.level))?;
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(filter);

    match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|error| anyhow!(error))
    .context("failed to install tracing subscriber")
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = init_logging() {
        eprintln!("logging disabled: {error:#}");
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed { count } => commands::seed::run(count),
        Command::List(args) => commands::list::run(args),
        Command::Show { id } => commands::customer::show(&id),
        Command::Create(fields) => commands::customer::create(fields),
        Command::Update { id, fields } => commands::customer::update(&id, fields),
        Command::Delete { id } => commands::customer::delete(&id),
        Command::Config => commands::config::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn list_flags_parse_into_optional_paging() {
        let cli = Cli::try_parse_from([
            "clientele",
            "list",
            "--page",
            "3",
            "--page-size",
            "25",
            "--sort",
            "city",
            "--desc",
        ])
        .expect("parse");

        let Command::List(args) = cli.command else {
            panic!("expected list command");
        };
        assert_eq!(args.page, Some(3));
        assert_eq!(args.page_size, Some(25));
        assert_eq!(args.sort.as_deref(), Some("city"));
        assert!(args.desc);
    }

    #[test]
    fn seed_count_defaults_to_fifty() {
        let cli = Cli::try_parse_from(["clientele", "seed"]).expect("parse");

        assert!(matches!(cli.command, Command::Seed { count: 50 }));
    }

    #[test]
    fn update_takes_id_and_field_flags() {
        let cli = Cli::try_parse_from(["clientele", "update", "some-id", "--city", "Oslo"])
            .expect("parse");

        let Command::Update { id, fields } = cli.command else {
            panic!("expected update command");
        };
        assert_eq!(id, "some-id");
        assert_eq!(fields.city.as_deref(), Some("Oslo"));
        assert_eq!(fields.company_name, None);
    }
}
