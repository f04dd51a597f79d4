//! Validate configuration and list the rule table.

use anyhow::Result;
use serde_json::json;

use super::CheckArgs;
use crate::context::Context;

/// Run the check command.
pub fn run(_args: CheckArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let rules = engine.rules();

    if ctx.output.is_json() {
        let rows: Vec<_> = rules
            .iter()
            .map(|rule| {
                json!({
                    "pattern": rule.pattern(),
                    "ttl": rule.ttl(),
                    "policy": rule.policy(),
                })
            })
            .collect();
        ctx.output.json(&json!({
            "config": ctx.config_path.as_ref().map(|p| p.display().to_string()),
            "rules": rows,
            "policies": engine.registry().names(),
        }));
        return Ok(());
    }

    ctx.output.section("Rules (first match wins)");
    ctx.output.rules(rules);

    let config = engine.config();
    let cache = &config.decision_cache;
    ctx.output.section("Settings");
    ctx.output.setting("browser-cache-seconds", config.browser_cache_seconds);
    ctx.output.setting("enable-tampering-checks", config.enable_tampering_checks);
    ctx.output.setting("debug", config.debug);
    if cache.enabled {
        ctx.output.setting(
            "decision-cache",
            format!("{:?} keys, {} entries, {}s", cache.key, cache.capacity, cache.expiry_seconds),
        );
    } else {
        ctx.output.setting("decision-cache", "off");
    }

    println!();
    ctx.output
        .done(&format!("Configuration is valid ({} rules)", rules.len()));
    Ok(())
}
