use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use gmd::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for gmd::AppCommand {
    fn from(cmd: Commands) -> gmd::AppCommand {
        match cmd {
            Commands::Summary { period } => gmd::AppCommand::Summary { period },
            Commands::Export { period } => gmd::AppCommand::Export { period },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display category summary tables
    Summary {
        /// Lookback period (1d, 5d, 1mo, 6mo, 1y, ytd, 5y, max)
        #[arg(short, long)]
        period: Option<String>,
    },
    /// Export normalized series as JSON
    Export {
        /// Lookback period (1d, 5d, 1mo, 6mo, 1y, ytd, 5y, max)
        #[arg(short, long)]
        period: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => gmd::cli::setup::setup(),
        Some(cmd) => gmd::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
