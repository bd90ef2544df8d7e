pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::act::ActionArg;

#[derive(Debug, Parser)]
#[command(
    name = "procura",
    about = "Procura operator CLI",
    long_about = "Operate the procurement approval workflow: migrations, config inspection, \
                  readiness checks, and request actions.",
    after_help = "Examples:\n  procura doctor --json\n  procura submit --user u-staff --title \"Standing desks\" --amount 5000 --request-type equipment\n  procura act pr-123 approve --user u-approver1"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load deterministic seed fixtures for local development and demos")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config, policy catalog, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Create a purchase request and submit it for approval")]
    Submit {
        #[arg(long, help = "Acting user id (the requester)")]
        user: String,
        #[arg(long, help = "Request title")]
        title: String,
        #[arg(long, default_value = "", help = "Request description")]
        description: String,
        #[arg(long, help = "Amount in the request currency, e.g. 5000 or 499.99")]
        amount: String,
        #[arg(long, default_value = "USD", help = "ISO currency code")]
        currency: String,
        #[arg(long = "request-type", help = "Request type the policy catalog routes on")]
        request_type: String,
        #[arg(long, help = "Stop after creating the draft instead of submitting")]
        draft: bool,
    },
    #[command(about = "Apply an approval workflow action to an existing request")]
    Act {
        #[arg(help = "Purchase request id")]
        request_id: String,
        #[arg(value_enum, help = "Action to apply")]
        action: ActionArg,
        #[arg(long, help = "Acting user id")]
        user: String,
        #[arg(long, help = "Optional comment recorded in the audit trail")]
        comment: Option<String>,
    },
    #[command(about = "Show the audit trail of a request, oldest entry first")]
    History {
        #[arg(help = "Purchase request id")]
        request_id: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Best effort: a broken config still reaches the command, which
    // reports it as a structured failure.
    if let Ok(config) = procura_core::config::AppConfig::load(Default::default()) {
        procura_service::init_logging(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Submit { user, title, description, amount, currency, request_type, draft } => {
            commands::submit::run(commands::submit::SubmitArgs {
                user,
                title,
                description,
                amount,
                currency,
                request_type,
                draft,
            })
        }
        Command::Act { request_id, action, user, comment } => {
            commands::act::run(&request_id, action, &user, comment)
        }
        Command::History { request_id } => commands::history::run(&request_id),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
