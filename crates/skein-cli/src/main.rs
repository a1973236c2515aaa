//! Skein CLI - Command line tools for encoded object graphs

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{completions, config as config_cmd, fmt as fmt_cmd, inspect, params, validate};
use config::{config_file_path, Config};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "skein")]
#[command(author, version, about = "Inspect, validate and reformat encoded object graphs")]
pub struct Cli {
    /// Config file (default: <config dir>/skein/config.toml)
    #[arg(short, long, env = "SKEIN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format: text, json
    #[arg(short, long, default_value = "text", global = true)]
    pub format: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the config file path
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config_file_path)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Summarise an encoded graph
    Inspect(inspect::InspectArgs),
    /// Check structure, ids and references
    Validate(validate::ValidateArgs),
    /// Show the root object's parameters
    Params(params::ParamsArgs),
    /// Re-render an encoded graph
    Fmt(fmt_cmd::FmtArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
    /// Manage configuration
    Config(config_cmd::ConfigArgs),
}

/// Application context with loaded configuration
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub format: OutputFormat,
}

impl AppContext {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let config_path = cli.config_path();
        tracing::debug!("Using config at: {:?}", config_path);

        let config = Config::load(&config_path)?;

        Ok(Self {
            config,
            config_path,
            format: OutputFormat::from(cli.format.as_str()),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting skein CLI");

    let ctx = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Inspect(args) => inspect::run(args, &ctx).await?,
        Commands::Validate(args) => validate::run(args, &ctx).await?,
        Commands::Params(args) => params::run(args, &ctx).await?,
        Commands::Fmt(args) => fmt_cmd::run(args, &ctx).await?,
        Commands::Completions(args) => completions::run(args)?,
        Commands::Config(args) => config_cmd::run(args, &ctx).await?,
    }

    Ok(())
}
