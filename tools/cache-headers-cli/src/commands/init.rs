//! Write a default configuration file.

use std::path::Path;

use anyhow::{bail, Context as _, Result};
use cache_headers_core::{generate_default_config, CacheHeadersConfig};

use super::InitArgs;
use crate::context::CONFIG_NAMES;
use crate::output::Output;

/// Run the init command.
pub fn run(args: InitArgs, cwd: &Path, output: &Output) -> Result<()> {
    let target = cwd.join(CONFIG_NAMES[0]);

    if target.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", target.display());
    }

    let content = generate_default_config();
    // Fail before writing if the template ever stops parsing.
    CacheHeadersConfig::from_toml(&content).context("Default config is invalid")?;

    std::fs::write(&target, content)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    output.done(&format!("Created {}", target.display()));
    output.next_steps(&["cache-headers check", "cache-headers resolve /some/path/"]);
    Ok(())
}
