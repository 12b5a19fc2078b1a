//! CLI argument structs for all commands.

use clap::{Parser, Subcommand};
use chrono::NaiveDate;

use super::types::{EdgeKindArg, GrantScopeArg, ItemStatusArg, PermissionKindArg};
use super::validators::{parse_date, validate_name};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Maximum workstream depth (roots are depth 1)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=64))]
    pub max_depth: Option<u32>,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Subcommands under `trellis stream`
#[derive(Subcommand, Debug, Clone)]
pub enum StreamCommand {
    /// Create a workstream
    Add(StreamAddArgs),

    /// Move a workstream under a new parent (or to the root)
    Move(StreamMoveArgs),

    /// Delete an empty leaf workstream
    Rm(StreamRmArgs),

    /// Render the workstream hierarchy as a tree
    Tree(StreamTreeArgs),
}

/// Arguments for `stream add`
#[derive(Parser, Debug, Clone)]
pub struct StreamAddArgs {
    /// Workstream name
    #[arg(value_parser = validate_name)]
    pub name: String,

    /// Parent workstream id (omit for a root)
    #[arg(short, long)]
    pub parent: Option<i64>,

    /// Owning principal id
    #[arg(short, long)]
    pub owner: i64,
}

/// Arguments for `stream move`
#[derive(Parser, Debug, Clone)]
pub struct StreamMoveArgs {
    /// Workstream id to move
    pub stream: i64,

    /// New parent workstream id (omit to make it a root)
    #[arg(short, long)]
    pub parent: Option<i64>,
}

/// Arguments for `stream rm`
#[derive(Parser, Debug, Clone)]
pub struct StreamRmArgs {
    /// Workstream id to delete
    pub stream: i64,
}

/// Arguments for `stream tree`
#[derive(Parser, Debug, Clone)]
pub struct StreamTreeArgs {
    /// Render only the subtree under this workstream
    #[arg(short, long)]
    pub root: Option<i64>,
}

/// Subcommands under `trellis item`
#[derive(Subcommand, Debug, Clone)]
pub enum ItemCommand {
    /// Create a work item inside a workstream
    Add(ItemAddArgs),

    /// Change a work item's status
    Status(ItemStatusArgs),

    /// Change a work item's target date
    Reschedule(ItemRescheduleArgs),

    /// Delete a work item
    Rm(ItemRmArgs),

    /// List the work items of one workstream
    List(ItemListArgs),
}

/// Arguments for `item add`
#[derive(Parser, Debug, Clone)]
pub struct ItemAddArgs {
    /// Item name
    #[arg(value_parser = validate_name)]
    pub name: String,

    /// Workstream id the item belongs to
    #[arg(short, long)]
    pub stream: i64,

    /// Initial status
    #[arg(long, value_enum, default_value = "pending")]
    pub status: ItemStatusArg,

    /// Target date (YYYY-MM-DD)
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Owning principal id
    #[arg(short, long)]
    pub owner: Option<i64>,
}

/// Arguments for `item status`
#[derive(Parser, Debug, Clone)]
pub struct ItemStatusArgs {
    /// Work item id
    pub item: i64,

    /// New status
    #[arg(value_enum)]
    pub status: ItemStatusArg,
}

/// Arguments for `item reschedule`
#[derive(Parser, Debug, Clone)]
pub struct ItemRescheduleArgs {
    /// Work item id
    pub item: i64,

    /// New target date (YYYY-MM-DD)
    #[arg(value_parser = parse_date)]
    pub date: NaiveDate,
}

/// Arguments for `item rm`
#[derive(Parser, Debug, Clone)]
pub struct ItemRmArgs {
    /// Work item id
    pub item: i64,
}

/// Arguments for `item list`
#[derive(Parser, Debug, Clone)]
pub struct ItemListArgs {
    /// Workstream id
    pub stream: i64,
}

/// Arguments for the `link` command
#[derive(Parser, Debug, Clone)]
pub struct LinkArgs {
    /// Prerequisite item id (the upstream end)
    pub prerequisite: i64,

    /// Dependent item id (the downstream end)
    pub dependent: i64,

    /// Edge kind
    #[arg(short, long, value_enum, default_value = "blocks")]
    pub kind: EdgeKindArg,
}

/// Arguments for the `unlink` command
#[derive(Parser, Debug, Clone)]
pub struct UnlinkArgs {
    /// Prerequisite item id
    pub prerequisite: i64,

    /// Dependent item id
    pub dependent: i64,
}

/// Arguments for the `grant` command
#[derive(Parser, Debug, Clone)]
pub struct GrantArgs {
    /// Workstream id
    pub stream: i64,

    /// Principal id receiving access
    pub principal: i64,

    /// Permission level
    #[arg(value_enum)]
    pub kind: PermissionKindArg,

    /// How far down the tree the grant reaches
    #[arg(short, long, value_enum, default_value = "node-only")]
    pub scope: GrantScopeArg,
}

/// Arguments for the `revoke` command
#[derive(Parser, Debug, Clone)]
pub struct RevokeArgs {
    /// Workstream id
    pub stream: i64,

    /// Principal id
    pub principal: i64,

    /// Permission level to revoke
    #[arg(value_enum)]
    pub kind: PermissionKindArg,

    /// Scope of the grant to revoke
    #[arg(short, long, value_enum, default_value = "node-only")]
    pub scope: GrantScopeArg,
}

/// Arguments for the `access` command
#[derive(Parser, Debug, Clone)]
pub struct AccessArgs {
    /// Workstream id
    pub stream: i64,

    /// Principal id to resolve access for
    pub principal: i64,
}

/// Arguments for the `chain` command
#[derive(Parser, Debug, Clone)]
pub struct ChainArgs {
    /// Work item id
    pub item: i64,
}

/// Arguments for the `impact` command
#[derive(Parser, Debug, Clone)]
pub struct ImpactArgs {
    /// The delayed work item id
    pub item: i64,

    /// The date the item was scheduled for (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub from: NaiveDate,

    /// The date it moved to (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub to: NaiveDate,
}

/// Arguments for the `rollup` command
#[derive(Parser, Debug, Clone)]
pub struct RollupArgs {
    /// Workstream id to roll up
    pub stream: i64,
}
