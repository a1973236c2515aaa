//! Config command for managing CLI configuration

use clap::{Args, Subcommand};

use crate::config::Config;
use crate::output::{format_json, OutputFormat};
use crate::AppContext;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Get a config value
    Get {
        /// Config key name
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key name
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
    /// Initialize default config file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(args: &ConfigArgs, ctx: &AppContext) -> anyhow::Result<()> {
    match &args.command {
        ConfigCommands::Get { key } => run_get(key, ctx),
        ConfigCommands::Set { key, value } => run_set(key, value, ctx),
        ConfigCommands::List => run_list(ctx),
        ConfigCommands::Path => {
            println!("{}", ctx.config_path.display());
            Ok(())
        }
        ConfigCommands::Init { force } => run_init(*force, ctx),
    }
}

fn run_get(key: &str, ctx: &AppContext) -> anyhow::Result<()> {
    match ctx.config.get(key) {
        Some(value) => println!("{}", value),
        None => anyhow::bail!(
            "Unknown config key: {}. Available keys: {}",
            key,
            Config::keys().join(", ")
        ),
    }
    Ok(())
}

fn run_set(key: &str, value: &str, ctx: &AppContext) -> anyhow::Result<()> {
    let mut config = ctx.config.clone();
    config.set(key, value)?;
    config.save(&ctx.config_path)?;
    println!("Set {} = {}", key, value);
    Ok(())
}

fn run_list(ctx: &AppContext) -> anyhow::Result<()> {
    if ctx.format == OutputFormat::Json {
        println!("{}", format_json(&ctx.config));
        return Ok(());
    }
    println!("Config file: {}", ctx.config_path.display());
    println!();
    for key in Config::keys() {
        let value = ctx.config.get(key).unwrap_or_else(|| "(not set)".to_string());
        println!("{} = {}", key, value);
    }
    Ok(())
}

fn run_init(force: bool, ctx: &AppContext) -> anyhow::Result<()> {
    let path = &ctx.config_path;

    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    Config::default().save(path)?;
    println!("Created config file at {}", path.display());
    Ok(())
}
