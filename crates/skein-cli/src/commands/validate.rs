//! Validate command: structural checks without a type registry

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use super::load_tree;
use crate::output::{format_json, OutputFormat};
use crate::AppContext;

#[derive(Args)]
pub struct ValidateArgs {
    /// Encoded graph file
    pub file: PathBuf,
}

#[derive(Serialize)]
struct Report {
    valid: bool,
    definitions: usize,
    references: usize,
}

pub async fn run(args: &ValidateArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let tree = load_tree(&args.file, ctx).await?;
    let definitions = tree
        .definitions()
        .with_context(|| format!("{} failed validation", args.file.display()))?;

    let report = Report {
        valid: true,
        definitions: definitions.len(),
        references: tree.stats().references,
    };
    match ctx.format {
        OutputFormat::Json => println!("{}", format_json(&report)),
        OutputFormat::Text => println!(
            "{}: valid ({} definitions, {} references)",
            args.file.display(),
            report.definitions,
            report.references
        ),
    }
    Ok(())
}
