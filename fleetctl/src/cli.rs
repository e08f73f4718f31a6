//! Clap derive surface (teacher-style: `ferrexctl`'s subcommand tree,
//! e.g. `stack up --server --profile`). `fleetctl` is the config
//! bootstrapper and smoke-test harness, not the interactive TUI.

use clap::{Parser, Subcommand};
use fleet_model::ResourceKind;

#[derive(Debug, Parser)]
#[command(
    name = "fleetctl",
    version,
    about = "Fleet view operational CLI: config bootstrap and data-plane smoke tests"
)]
pub struct Cli {
    /// Comma-separated cluster contexts to fan out across.
    #[arg(long, global = true, default_value = "prod", value_delimiter = ',')]
    pub contexts: Vec<String>,

    /// Path to a TOML configuration file (layered under env/defaults).
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List a resource kind across all configured contexts.
    Get {
        /// pod|deployment|statefulset|service|ingress|configmap|secret
        kind: ResourceKind,
        /// Namespace to list within.
        #[arg(long, default_value = "default")]
        namespace: String,
        /// Show the NAMESPACE column even for a single-namespace query.
        #[arg(long)]
        show_namespace: bool,
    },
    /// Subscribe to live changes for a resource kind and print events
    /// as they coalesce in, until interrupted.
    Watch {
        kind: ResourceKind,
        #[arg(long, default_value = "default")]
        namespace: String,
    },
    /// Delete a named resource in one context.
    Delete {
        kind: ResourceKind,
        name: String,
        #[arg(long, default_value = "default")]
        namespace: String,
        /// Which context to delete from (defaults to the first configured one).
        #[arg(long)]
        context: Option<String>,
    },
    /// Stream a pod's logs.
    Logs {
        pod: String,
        #[arg(long, default_value = "default")]
        namespace: String,
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        tail_lines: Option<i64>,
        #[arg(long)]
        follow: bool,
    },
    /// Print the effective configuration and which layer supplied it.
    Config,
    /// Print cumulative resource cache metrics.
    CacheStats {
        kind: ResourceKind,
        #[arg(long, default_value = "default")]
        namespace: String,
    },
}
