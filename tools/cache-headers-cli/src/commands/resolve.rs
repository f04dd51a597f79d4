//! Show the decision and headers for one path.

use anyhow::{Context as _, Result};
use cache_headers::DecisionSource;
use cache_headers_core::AuthContext;
use chrono::Utc;
use serde_json::{json, Map, Value};

use super::ResolveArgs;
use crate::context::Context;
use crate::output::format_ttl;

/// Run the resolve command.
pub fn run(args: ResolveArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;

    let mut auth = match &args.user {
        Some(user) => AuthContext::authenticated(user.as_str()),
        None => AuthContext::anonymous(),
    };
    if let Some(session) = &args.session {
        auth = auth.with_session(session.as_str());
    }

    let (decision, source) = engine.decide_explained(&args.path);
    let headers = engine
        .headers_for(&decision, &auth, Utc::now())
        .context("Failed to apply policy")?;

    let source = match source {
        DecisionSource::Store => "decision cache",
        DecisionSource::Scan => "rule table",
    };

    if ctx.output.is_json() {
        let header_map: Map<String, Value> = headers
            .iter()
            .map(|(name, value)| (name.to_string(), Value::from(value)))
            .collect();
        ctx.output.json(&json!({
            "path": args.path,
            "user": args.user,
            "ttl": decision.ttl,
            "policy": decision.policy,
            "source": source,
            "headers": header_map,
        }));
        return Ok(());
    }

    ctx.output.section(&format!("Decision for {}", args.path));
    ctx.output
        .setting("requester", args.user.as_deref().unwrap_or("anonymous"));
    ctx.output.setting("ttl", format_ttl(decision.ttl));
    ctx.output
        .setting("policy", decision.policy.as_deref().unwrap_or("(none)"));
    ctx.output.setting("from", source);

    ctx.output.section("Headers");
    ctx.output.headers(&headers);

    Ok(())
}
