//! Params command: show the root object's encoded parameters

use std::path::PathBuf;

use clap::Args;
use serde_json::json;
use skein_core::EncodedNode;

use super::load_tree;
use crate::output::{format_json, OutputFormat};
use crate::AppContext;

#[derive(Args)]
pub struct ParamsArgs {
    /// Encoded graph file
    pub file: PathBuf,

    /// Parameter names to show (all if omitted)
    pub names: Vec<String>,
}

pub async fn run(args: &ParamsArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let tree = load_tree(&args.file, ctx).await?;
    let EncodedNode::Object { id, type_tag, params } = &tree else {
        anyhow::bail!("Root of {} is not a typed object", args.file.display());
    };

    let selected: Vec<(&str, &EncodedNode)> = if args.names.is_empty() {
        params.iter().map(|(name, node)| (name.as_str(), node)).collect()
    } else {
        args.names
            .iter()
            .map(|name| {
                tree.param(name)
                    .map(|node| (name.as_str(), node))
                    .ok_or_else(|| anyhow::anyhow!("Parameter '{}' not found in {}", name, type_tag))
            })
            .collect::<anyhow::Result<_>>()?
    };

    match ctx.format {
        OutputFormat::Json => {
            let params: serde_json::Map<String, serde_json::Value> = selected
                .iter()
                .map(|(name, node)| Ok::<_, anyhow::Error>((name.to_string(), serde_json::to_value(node)?)))
                .collect::<anyhow::Result<_>>()?;
            println!("{}", format_json(&json!({ "type": type_tag, "id": id, "params": params })));
        }
        OutputFormat::Text => {
            println!("{} (id {})", type_tag, id);
            for (name, node) in selected {
                println!("  {} = {}", name, serde_json::to_string(node)?);
            }
        }
    }
    Ok(())
}
