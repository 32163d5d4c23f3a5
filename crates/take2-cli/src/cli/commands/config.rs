//! `take2 config` – show where the config lives and the policy it resolves to.

use anyhow::{Context, Result};
use std::path::Path;
use take2_core::config::Take2Config;

pub fn run_config(path: &Path, cfg: &Take2Config) -> Result<()> {
    let policy = cfg
        .policy
        .to_policy()
        .with_context(|| format!("invalid [policy] section in {}", path.display()))?;
    println!("config: {}", path.display());
    println!("{policy}");
    Ok(())
}
