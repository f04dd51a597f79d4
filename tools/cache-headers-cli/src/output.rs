//! Terminal and JSON rendering for rule tables, decisions and headers.

use cache_headers::{header_names, HeaderSet, RuleTable, NO_CACHE};
use console::style;
use serde::Serialize;

/// Where command results go. In JSON mode only machine output and errors
/// are printed.
#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
}

impl Output {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// A completed action, e.g. a file written.
    pub fn done(&self, msg: &str) {
        if !self.json {
            println!("{} {}", style("✓").green(), msg);
        }
    }

    pub fn warn(&self, msg: &str) {
        if !self.json {
            eprintln!("{} {}", style("⚠").yellow(), msg);
        }
    }

    /// Report a failed command. Printed in both modes.
    pub fn fail(&self, msg: &str) {
        if self.json {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        } else {
            eprintln!("{} {}", style("✗").red(), style(msg).red());
        }
    }

    /// Verbose-only trace of what the CLI is doing.
    pub fn trace(&self, msg: &str) {
        if self.verbose && !self.json {
            eprintln!("{}", style(msg).dim());
        }
    }

    pub fn section(&self, title: &str) {
        if !self.json {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn setting(&self, key: &str, value: impl std::fmt::Display) {
        if !self.json {
            println!("  {}: {}", style(key).dim(), value);
        }
    }

    /// The rule table in match order.
    pub fn rules(&self, rules: &RuleTable) {
        if self.json {
            return;
        }
        if rules.is_empty() {
            self.warn("No rules configured; every response is no-cache");
            return;
        }
        for line in rule_lines(rules) {
            println!("  {}", line);
        }
    }

    /// Response headers, with `Cache-Control` coloured by cacheability.
    pub fn headers(&self, headers: &HeaderSet) {
        if self.json {
            return;
        }
        for (name, value) in headers.iter() {
            let shown = if name.eq_ignore_ascii_case(header_names::CACHE_CONTROL) {
                if value == NO_CACHE {
                    style(value).yellow().to_string()
                } else {
                    style(value).green().to_string()
                }
            } else {
                value.to_string()
            };
            println!("  {}: {}", style(name).dim(), shown);
        }
    }

    /// Commands worth running next.
    pub fn next_steps(&self, commands: &[&str]) {
        if !self.json {
            for command in commands {
                println!("  $ {}", style(command).cyan());
            }
        }
    }

    pub fn json<T: Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{}", json);
        }
    }

    /// Unformatted text such as a generated VCL snippet.
    pub fn raw(&self, text: &str) {
        print!("{}", text);
    }
}

/// Aligned `PATTERN  TTL  POLICY` lines, header first.
pub fn rule_lines(rules: &RuleTable) -> Vec<String> {
    let width = rules
        .iter()
        .map(|rule| rule.pattern().len())
        .max()
        .unwrap_or(0)
        .max("PATTERN".len());

    std::iter::once(format!("{:width$}  {:>8}  POLICY", "PATTERN", "TTL", width = width))
        .chain(rules.iter().map(|rule| {
            format!(
                "{:width$}  {:>8}  {}",
                rule.pattern(),
                format_ttl(rule.ttl()),
                rule.policy(),
                width = width
            )
        }))
        .collect()
}

/// Seconds as a short ttl such as `10m` or `1h 30m`. Zero reads as `never`.
pub fn format_ttl(secs: u64) -> String {
    match secs {
        0 => "never".to_string(),
        s if s < 60 => format!("{}s", s),
        s if s < 3600 && s % 60 == 0 => format!("{}m", s / 60),
        s if s < 3600 => format!("{}m {}s", s / 60, s % 60),
        s if s % 3600 == 0 => format!("{}h", s / 3600),
        s => format!("{}h {}m", s / 3600, (s % 3600) / 60),
    }
}
