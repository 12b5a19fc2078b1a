//! CLI argument parsing and command dispatch.
//!
//! The command-line interface for trellis using clap's derive API. Each
//! command has its own argument struct; dispatch goes through
//! [`crate::app::App`].
//!
//! # Commands
//!
//! - `init`: Initialize a new portfolio
//! - `stream add|move|rm|tree`: Manage the workstream hierarchy
//! - `item add|status|reschedule|rm|list`: Manage work items
//! - `link` / `unlink`: Manage dependency edges
//! - `grant` / `revoke` / `access`: Manage and inspect permissions
//! - `chain`: Transitive prerequisites of an item
//! - `ready`: Items whose blockers are complete
//! - `impact`: Downstream impact of a schedule slip
//! - `rollup`: Subtree completion aggregate
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! trellis stream add "Platform" --owner 1
//! trellis item add "Ship 2.0" --stream 1 --date 2025-09-01
//! trellis link 1 2 --kind blocks
//! trellis impact 1 --from 2025-09-01 --to 2025-09-11
//! ```

mod args;
mod execute;
mod types;
mod validators;

use clap::{Parser, Subcommand};

pub use args::{
    AccessArgs, ChainArgs, GrantArgs, ImpactArgs, InitArgs, ItemAddArgs, ItemCommand,
    ItemListArgs, ItemRescheduleArgs, ItemRmArgs, ItemStatusArgs, LinkArgs, RevokeArgs,
    RollupArgs, StreamAddArgs, StreamCommand, StreamMoveArgs, StreamRmArgs, StreamTreeArgs,
    UnlinkArgs,
};
pub use execute::execute;
pub use types::{EdgeKindArg, GrantScopeArg, ItemStatusArg, PermissionKindArg};
pub use validators::{parse_date, validate_name};

/// Trellis - a workstream portfolio and dependency tracker
///
/// Organize releases into a bounded-depth hierarchy of workstreams, link
/// their tasks with typed dependencies, and ask schedule questions: what is
/// ready, what slips when this slips, how done is this subtree. State lives
/// in `.trellis/portfolio.jsonl` for easy version control integration.
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Parse arguments from the process command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Execute the parsed command.
    ///
    /// # Errors
    ///
    /// Returns the first store, analysis, or I/O error the command hits.
    pub async fn execute(self) -> crate::error::Result<()> {
        execute(self).await
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new trellis portfolio
    ///
    /// Creates the `.trellis/` directory with configuration and an empty
    /// snapshot. Run this once in your project root.
    Init(InitArgs),

    /// Manage the workstream hierarchy
    Stream {
        /// Hierarchy operation
        #[command(subcommand)]
        command: StreamCommand,
    },

    /// Manage work items
    Item {
        /// Item operation
        #[command(subcommand)]
        command: ItemCommand,
    },

    /// Add a dependency edge between two items
    Link(LinkArgs),

    /// Remove a dependency edge
    Unlink(UnlinkArgs),

    /// Grant a permission on a workstream
    Grant(GrantArgs),

    /// Revoke a permission grant
    Revoke(RevokeArgs),

    /// Show a principal's effective access on a workstream
    Access(AccessArgs),

    /// Show the transitive prerequisites of an item
    Chain(ChainArgs),

    /// List pending items whose blockers are all complete
    Ready,

    /// Assess the downstream impact of a schedule slip
    Impact(ImpactArgs),

    /// Roll up completion state for a workstream's subtree
    Rollup(RollupArgs),
}
