//! Fmt command: re-render an encoded graph

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use super::load_tree;
use crate::AppContext;

#[derive(Args)]
pub struct FmtArgs {
    /// Encoded graph file
    pub file: PathBuf,

    /// Indent the output
    #[arg(long, conflicts_with = "compact")]
    pub pretty: bool,

    /// Single-line output
    #[arg(long)]
    pub compact: bool,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: &FmtArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let tree = load_tree(&args.file, ctx).await?;
    tree.validate()
        .with_context(|| format!("{} failed validation", args.file.display()))?;

    let pretty = args.pretty || (ctx.config.pretty && !args.compact);
    let rendered = if pretty {
        serde_json::to_string_pretty(&tree)?
    } else {
        serde_json::to_string(&tree)?
    };

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, format!("{}\n", rendered))
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
