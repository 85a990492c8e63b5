// cost-uploader - daily Criteo/Kelkoo ad cost upload to Google Sheets

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cost_uploader_cli::exit_codes::EXIT_SUCCESS;
use cost_uploader_cli::fetch::ReportWindow;
use cost_uploader_cli::{pipeline, CliError};
use cost_uploader_config::Settings;

#[derive(Parser)]
#[command(name = "cost-uploader")]
#[command(about = "Publish the last two days of Criteo and Kelkoo ad costs to a Google Sheet")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/cost-uploader/config.toml, optional)
    #[arg(long, global = true, env = "COST_UPLOADER_CONFIG")]
    config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log request detail
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch both sources, merge, then replace the sheet's data range
    #[command(after_help = "\
Examples:
  cost-uploader upload
  cost-uploader upload --config /etc/cost-uploader/config.toml
  RUST_LOG=debug cost-uploader upload")]
    Upload,

    /// Fetch and merge as `upload` does, but write CSV instead of the sheet
    #[command(after_help = "\
Examples:
  cost-uploader preview
  cost-uploader preview --out costs.csv")]
    Preview {
        /// Output CSV file path (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(quiet: bool, verbose: bool) {
    let default_filter = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_target(false)
        .format_timestamp_secs()
        .init();
}

fn load_settings(config: Option<&Path>) -> Result<Settings, CliError> {
    Settings::load(config).map_err(CliError::config)
}

fn today_window(settings: &Settings) -> ReportWindow {
    ReportWindow::current(&settings.criteo.timezone, chrono::Utc::now())
}

fn cmd_upload(config: Option<&Path>) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    pipeline::upload(&settings, &today_window(&settings))?;
    println!("Finished - check sheet.");
    Ok(())
}

fn cmd_preview(config: Option<&Path>, out: Option<PathBuf>) -> Result<(), CliError> {
    let settings = load_settings(config)?;
    let rows = pipeline::collect(&settings, &today_window(&settings))?;
    let label = pipeline::write_csv(&rows, &out)?;
    log::info!("wrote {} rows to {}", rows.len(), label);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let result = match cli.command {
        Commands::Upload => cmd_upload(cli.config.as_deref()),
        Commands::Preview { out } => cmd_preview(cli.config.as_deref(), out),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
