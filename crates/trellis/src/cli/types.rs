//! CLI value enums and domain type conversions.

use clap::ValueEnum;

use crate::domain::{EdgeKind, GrantScope, ItemStatus, PermissionKind};

// ============================================================================
// Value Enums
// ============================================================================

/// Dependency edge kind for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKindArg {
    /// Hard blocker: the dependent cannot start until this completes
    Blocks,
    /// Unlocks the dependent without gating it
    Enables,
    /// Schedule-awareness only
    Informs,
}

impl std::fmt::Display for EdgeKindArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocks => write!(f, "blocks"),
            Self::Enables => write!(f, "enables"),
            Self::Informs => write!(f, "informs"),
        }
    }
}

impl From<EdgeKindArg> for EdgeKind {
    fn from(arg: EdgeKindArg) -> Self {
        match arg {
            EdgeKindArg::Blocks => EdgeKind::Blocks,
            EdgeKindArg::Enables => EdgeKind::Enables,
            EdgeKindArg::Informs => EdgeKind::Informs,
        }
    }
}

/// Work item status for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatusArg {
    /// Not started
    Pending,
    /// Currently being worked on
    #[value(name = "in_progress", alias = "in-progress")]
    InProgress,
    /// Done
    Completed,
    /// Abandoned
    Cancelled,
}

impl std::fmt::Display for ItemStatusArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<ItemStatusArg> for ItemStatus {
    fn from(arg: ItemStatusArg) -> Self {
        match arg {
            ItemStatusArg::Pending => ItemStatus::Pending,
            ItemStatusArg::InProgress => ItemStatus::InProgress,
            ItemStatusArg::Completed => ItemStatus::Completed,
            ItemStatusArg::Cancelled => ItemStatus::Cancelled,
        }
    }
}

/// Permission kind for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionKindArg {
    /// Read-only access
    View,
    /// Modify items and schedules
    Edit,
    /// Full control, including grants
    Admin,
}

impl std::fmt::Display for PermissionKindArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::View => write!(f, "view"),
            Self::Edit => write!(f, "edit"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl From<PermissionKindArg> for PermissionKind {
    fn from(arg: PermissionKindArg) -> Self {
        match arg {
            PermissionKindArg::View => PermissionKind::View,
            PermissionKindArg::Edit => PermissionKind::Edit,
            PermissionKindArg::Admin => PermissionKind::Admin,
        }
    }
}

/// Grant scope for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantScopeArg {
    /// The granted workstream only
    #[value(name = "node-only", alias = "node")]
    NodeOnly,
    /// The granted workstream and its whole subtree
    #[value(name = "subtree", alias = "node-and-descendants")]
    Subtree,
}

impl std::fmt::Display for GrantScopeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeOnly => write!(f, "node-only"),
            Self::Subtree => write!(f, "subtree"),
        }
    }
}

impl From<GrantScopeArg> for GrantScope {
    fn from(arg: GrantScopeArg) -> Self {
        match arg {
            GrantScopeArg::NodeOnly => GrantScope::NodeOnly,
            GrantScopeArg::Subtree => GrantScope::NodeAndDescendants,
        }
    }
}
