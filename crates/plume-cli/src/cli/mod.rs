mod commands;
mod helpers;

use clap::Parser;
use plume_core::domain::PlumeError;
use tracing_subscriber::EnvFilter;

pub fn run_from_env() -> i32 {
    let args = std::env::args().collect::<Vec<_>>();

    match parse_and_dispatch(args) {
        Ok(code) => code,
        Err(error) => {
            let plume_error = error.as_plume_error();
            eprintln!("{}", plume_error.diagnostic_line());
            if let Some(summary_line) = plume_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            plume_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_logging(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

/// `RUST_LOG` takes precedence over `-v`.
fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "plume-rise",
    version,
    about = "Run the plume rise model and derive smoke detrainment profiles"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Run the plume model once and archive its detrainment profile
    Run(commands::RunArgs),
    /// Run an entrainment-coefficient sweep from a JSON config
    Sweep(commands::SweepArgs),
    /// Compute a detrainment profile from an existing final_plume.dat
    Detrain(commands::DetrainArgs),
    /// Check run parameters without running the model
    Validate(commands::ValidateArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_run_command(args),
        CliCommand::Sweep(args) => commands::run_sweep_command(args),
        CliCommand::Detrain(args) => commands::run_detrain_command(args),
        CliCommand::Validate(args) => commands::run_validate_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(PlumeError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_plume_error(&self) -> PlumeError {
        match self {
            Self::Usage(message) => PlumeError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => PlumeError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
