//! CLI command implementations

pub mod completions;
pub mod config;
pub mod fmt;
pub mod inspect;
pub mod params;
pub mod validate;

use std::path::Path;

use anyhow::Context;
use skein_core::{parse_tree, EncodedNode};

use crate::AppContext;

/// Read and parse an encoded graph, applying the configured limits
pub async fn load_tree(file: &Path, ctx: &AppContext) -> anyhow::Result<EncodedNode> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let tree = parse_tree(&text, &ctx.config.decode_options())
        .with_context(|| format!("Invalid encoded graph in {}", file.display()))?;
    tracing::debug!(file = %file.display(), "Parsed encoded graph");
    Ok(tree)
}
