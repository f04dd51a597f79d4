//! Print the Varnish hashing snippet.

use anyhow::{Context as _, Result};

use super::VclArgs;
use crate::context::Context;

/// Run the vcl command.
pub fn run(args: VclArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let snippet = cache_headers::vcl::generate(&engine).context("Failed to generate VCL")?;

    match args.output {
        Some(path) => {
            let target = ctx.cwd.join(&path);
            std::fs::write(&target, &snippet)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            ctx.output.done(&format!("Wrote {}", target.display()));
        }
        None if ctx.output.is_json() => ctx.output.json(&serde_json::json!({ "vcl": snippet })),
        None => ctx.output.raw(&snippet),
    }

    Ok(())
}
