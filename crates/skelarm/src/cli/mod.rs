pub mod check;
pub mod dynamics;
pub mod fk;
pub mod ik;
pub mod simulate;

use anyhow::Result;
use skelarm::Config;
use skelarm_core::Chain;
use std::path::Path;

/// Load, validate and build the chain described by `path`.
fn load(path: &Path) -> Result<(Config, Chain)> {
    let config = Config::from_file(path)?;
    let chain = config.build_chain()?;
    tracing::info!(path = %path.display(), links = chain.len(), "loaded chain");
    Ok((config, chain))
}

fn format_values(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
