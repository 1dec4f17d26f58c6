use std::path::PathBuf;

use bc_fetch::client::{Credentials, HttpClient};
use bc_fetch::io::summary::JsonFileSink;
use bc_fetch::{Result, ToolError, config, pipeline};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging(&cli.log_level).and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Fetch(args) => execute_fetch(args),
    }
}

fn execute_fetch(args: FetchArgs) -> Result<()> {
    let config = config::load(&args.config_dir, &args.org, &args.env)?;
    let secrets = config::load_secrets(&args.config_dir, &args.org, &args.env)?;
    let credentials = Credentials::resolve(args.token, &config.global, &secrets)?;

    let mut client = HttpClient::new(&config.global, credentials)?;
    let mut sink = JsonFileSink::new(&args.output_dir);
    pipeline::run(&config, &mut client, &mut sink, &args.output_dir)?;
    Ok(())
}

fn init_logging(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|error| ToolError::Logging(error.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Export Business Central configuration tables to Excel."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every configured company/API pair into one workbook.
    Fetch(FetchArgs),
}

#[derive(clap::Args)]
struct FetchArgs {
    /// Organisation identifier, selects `{org}-{env}-config.json`.
    org: String,

    /// Environment type, e.g. `test` or `prod`.
    env: String,

    /// Directory holding the configuration and secrets files.
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Directory receiving the workbook and run summary.
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Pre-issued bearer token; skips the client-credentials flow.
    #[arg(long, env = "BC_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,
}
