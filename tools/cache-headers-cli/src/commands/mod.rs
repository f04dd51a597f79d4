//! CLI command implementations.

pub mod check;
pub mod init;
pub mod resolve;
pub mod vcl;

use clap::Args;

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {}

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// Full request path, query string included.
    pub path: String,

    /// Resolve for an authenticated user with this id.
    #[arg(short, long)]
    pub user: Option<String>,

    /// Session key of the requester.
    #[arg(short, long)]
    pub session: Option<String>,
}

/// Arguments for the vcl command.
#[derive(Args)]
pub struct VclArgs {
    /// Write the snippet to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing config file.
    #[arg(short, long)]
    pub force: bool,
}
