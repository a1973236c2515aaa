//! Inspect command: summary counts for an encoded graph

use std::path::PathBuf;

use clap::Args;

use super::load_tree;
use crate::output::{format_json, OutputFormat};
use crate::AppContext;

#[derive(Args)]
pub struct InspectArgs {
    /// Encoded graph file
    pub file: PathBuf,
}

pub async fn run(args: &InspectArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let tree = load_tree(&args.file, ctx).await?;
    let stats = tree.stats();

    match ctx.format {
        OutputFormat::Json => println!("{}", format_json(&stats)),
        OutputFormat::Text => {
            println!("Definitions: {}", stats.definitions);
            println!("  sequences: {}", stats.sequences);
            println!("  sets:      {}", stats.sets);
            println!("  maps:      {}", stats.maps);
            println!("  objects:   {}", stats.objects);
            println!("References:  {}", stats.references);
            println!("Atomics:     {}", stats.atomics);
            println!("Max depth:   {}", stats.max_depth);
            if !stats.types.is_empty() {
                println!("Types:");
                for (tag, count) in &stats.types {
                    println!("  {} x{}", tag, count);
                }
            }
        }
    }
    Ok(())
}
