//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use cache_headers::{PolicyEngine, PolicyRegistry};
use cache_headers_core::CacheHeadersConfig;

use crate::output::Output;

/// File names searched for, in order, in each directory.
pub const CONFIG_NAMES: [&str; 3] = ["cache-headers.toml", ".cache-headers.toml", "cache-headers.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// Loaded configuration.
    pub config: CacheHeadersConfig,
    /// Where the configuration came from, if anywhere.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from an explicit config file or the nearest one found.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config_path = match config_path {
            Some(path) => Some(PathBuf::from(path)),
            None => find_config(&cwd),
        };

        let config = match &config_path {
            Some(path) => {
                output.trace(&format!("Using config: {}", path.display()));
                CacheHeadersConfig::load(path)
                    .with_context(|| format!("Failed to load config: {}", path.display()))?
            }
            None => {
                output.warn("No config file found, using defaults (no rules)");
                CacheHeadersConfig::default()
            }
        };

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Build the engine with the built-in policies.
    pub fn engine(&self) -> Result<PolicyEngine> {
        PolicyEngine::new(self.config.clone(), PolicyRegistry::with_builtins())
            .context("Invalid configuration")
    }
}

/// Find a config file in the directory tree above `start`.
fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}
