//! Domain types for the portfolio engine.
//!
//! This module contains the core domain types for trellis: workstreams (the
//! hierarchy), permission grants, work items, and the typed dependency edges
//! between items, plus the ephemeral report types the analyzers produce.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maximum length of a workstream or work item name.
pub const MAX_NAME_LENGTH: usize = 120;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a workstream
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StreamId(pub i64);

impl StreamId {
    /// Create a new workstream ID
    pub fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for StreamId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Unique identifier for a work item
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl ItemId {
    /// Create a new work item ID
    pub fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Unique identifier for a principal (a user or service account)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PrincipalId(pub i64);

impl PrincipalId {
    /// Create a new principal ID
    pub fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PrincipalId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Workstreams
// ============================================================================

/// A node in the workstream hierarchy
///
/// Roots have `parent == None` and `depth == 1`; every other node sits at
/// `parent.depth + 1`. The store enforces both, along with the configured
/// maximum depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workstream {
    /// Unique identifier
    pub id: StreamId,

    /// Display name
    pub name: String,

    /// Parent workstream (None for roots)
    pub parent: Option<StreamId>,

    /// Depth in the tree (1 for roots)
    pub depth: u32,

    /// Owning principal
    pub owner: PrincipalId,
}

/// Data for creating a new workstream
#[derive(Debug, Clone)]
pub struct NewStream {
    /// Display name
    pub name: String,

    /// Parent workstream (None for a new root)
    pub parent: Option<StreamId>,

    /// Owning principal
    pub owner: PrincipalId,
}

// ============================================================================
// Permissions
// ============================================================================

/// Permission level on a workstream
///
/// The variants are ordered by strength: `Admin` implies `Edit`, which
/// implies `View`. The derived `Ord` carries that order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    /// Read-only access
    View,

    /// Modify items and schedules
    Edit,

    /// Full control, including grants
    Admin,
}

impl PermissionKind {
    /// Whether this kind is at least as strong as `other`.
    pub fn implies(self, other: PermissionKind) -> bool {
        self >= other
    }

    /// All kinds this one implies, strongest first.
    pub fn implied_kinds(self) -> impl Iterator<Item = PermissionKind> {
        [PermissionKind::Admin, PermissionKind::Edit, PermissionKind::View]
            .into_iter()
            .filter(move |k| self.implies(*k))
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View => write!(f, "view"),
            Self::Edit => write!(f, "edit"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// How far down the tree a grant reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantScope {
    /// The granted workstream only
    NodeOnly,

    /// The granted workstream and its whole subtree
    NodeAndDescendants,
}

impl fmt::Display for GrantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeOnly => write!(f, "node-only"),
            Self::NodeAndDescendants => write!(f, "node-and-descendants"),
        }
    }
}

/// A permission grant on a workstream
///
/// Grants are immutable once created; the only mutation is revocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// The workstream the grant attaches to
    pub stream: StreamId,

    /// The principal receiving access
    pub principal: PrincipalId,

    /// Permission level
    pub kind: PermissionKind,

    /// Subtree reach
    pub scope: GrantScope,
}

/// A grant inherited from an ancestor workstream, with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InheritedGrant {
    /// Permission level of the inherited grant
    pub kind: PermissionKind,

    /// The ancestor the grant lives on
    pub from_stream: StreamId,

    /// That ancestor's name, for display
    pub from_name: String,
}

/// Resolved access for one principal on one workstream
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveAccess {
    /// Kinds granted directly on the workstream (any scope)
    pub direct: Vec<PermissionKind>,

    /// Kinds inherited from ancestors via subtree-scoped grants, nearest first
    pub inherited: Vec<InheritedGrant>,

    /// The union of direct and inherited kinds, closed downward
    /// (admin implies edit implies view)
    pub effective: BTreeSet<PermissionKind>,
}

impl EffectiveAccess {
    /// Whether the effective set contains a kind at least as strong as `kind`.
    pub fn allows(&self, kind: PermissionKind) -> bool {
        self.effective.iter().any(|k| k.implies(kind))
    }
}

// ============================================================================
// Work items
// ============================================================================

/// Status of a work item
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Not started
    Pending,

    /// Currently being worked on
    InProgress,

    /// Done
    Completed,

    /// Abandoned; never counts toward completion
    Cancelled,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A work item - a release or checklist task inside a workstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier
    pub id: ItemId,

    /// The workstream this item belongs to
    pub stream: StreamId,

    /// Display name
    pub name: String,

    /// Current status
    pub status: ItemStatus,

    /// Scheduled date (optional)
    pub target_date: Option<NaiveDate>,

    /// Owning principal (optional)
    pub owner: Option<PrincipalId>,
}

/// Data for creating a new work item
#[derive(Debug, Clone)]
pub struct NewItem {
    /// Display name
    pub name: String,

    /// The workstream the item belongs to
    pub stream: StreamId,

    /// Initial status
    pub status: ItemStatus,

    /// Scheduled date (optional)
    pub target_date: Option<NaiveDate>,

    /// Owning principal (optional)
    pub owner: Option<PrincipalId>,
}

// ============================================================================
// Dependency edges
// ============================================================================

/// Kind of dependency between two work items, in decreasing strictness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// The dependent cannot start until the prerequisite completes
    Blocks,

    /// The prerequisite unlocks the dependent but does not gate it
    Enables,

    /// Schedule-awareness only
    Informs,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocks => write!(f, "blocks"),
            Self::Enables => write!(f, "enables"),
            Self::Informs => write!(f, "informs"),
        }
    }
}

/// A directed dependency edge, stored prerequisite -> dependent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The upstream item
    pub prerequisite: ItemId,

    /// The downstream item
    pub dependent: ItemId,

    /// Edge kind
    pub kind: EdgeKind,
}

// ============================================================================
// Analyzer inputs and reports
// ============================================================================

/// A schedule shift on one work item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DelayEvent {
    /// The item whose date moved
    pub item: ItemId,

    /// The date it was scheduled for
    pub original_date: NaiveDate,

    /// The date it moved to
    pub new_date: NaiveDate,
}

impl DelayEvent {
    /// Size of the shift in days. Negative when the item moved earlier.
    pub fn delay_days(&self) -> i64 {
        (self.new_date - self.original_date).num_days()
    }
}

/// How strongly a downstream item is affected by a delay
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Reached only through informs edges
    Low,

    /// Reached through an enables edge (but no blocks path)
    Medium,

    /// Reached through a blocks path
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Risk classification for a critical path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// No delayed item on the path
    Low,

    /// At least one delayed item sits on the path
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::High => write!(f, "high"),
        }
    }
}

/// One downstream item affected by a delay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactedItem {
    /// The affected item
    pub item: ItemId,

    /// Strongest path class that reaches it
    pub severity: Severity,

    /// The triggering shift, carried through verbatim
    pub delay_days: i64,

    /// Suggested new date (the event's new date)
    pub recommended_date: NaiveDate,
}

/// Result of assessing a delay event
#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    /// The item whose date moved
    pub source: ItemId,

    /// Size of the shift in days
    pub delay_days: i64,

    /// Affected items, severity-descending then by id; excludes the source
    pub impacted: Vec<ImpactedItem>,
}

/// The longest chain of blocking work starting at an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriticalPath {
    /// Items on the chain, starting item first
    pub items: Vec<ItemId>,

    /// Number of items on the chain
    pub length: usize,

    /// High iff a delayed item sits on the chain
    pub risk: RiskLevel,
}

/// Per-child completion breakdown inside an aggregate report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildRollup {
    /// The direct child workstream
    pub stream: StreamId,

    /// That child's name
    pub name: String,

    /// Items in the child's own subtree
    pub total: u64,

    /// Completed items in the child's own subtree
    pub completed: u64,

    /// Completion percentage, one decimal; 0.0 when total is 0
    pub completion_pct: f64,
}

/// Rolled-up completion state for a workstream's subtree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    /// The workstream the rollup was computed for
    pub stream: StreamId,

    /// Items in the whole subtree, the workstream itself included
    pub total: u64,

    /// Completed items in the whole subtree
    pub completed: u64,

    /// Item counts per status
    pub status_counts: BTreeMap<ItemStatus, u64>,

    /// Completion percentage, one decimal; 0.0 when total is 0
    pub completion_pct: f64,

    /// Breakdown per immediate child, ordered by id
    pub children: Vec<ChildRollup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_kind_order() {
        assert!(PermissionKind::Admin > PermissionKind::Edit);
        assert!(PermissionKind::Edit > PermissionKind::View);
    }

    #[test]
    fn test_permission_implies() {
        assert!(PermissionKind::Admin.implies(PermissionKind::View));
        assert!(PermissionKind::Admin.implies(PermissionKind::Admin));
        assert!(PermissionKind::Edit.implies(PermissionKind::View));
        assert!(!PermissionKind::View.implies(PermissionKind::Edit));
        assert!(!PermissionKind::Edit.implies(PermissionKind::Admin));
    }

    #[test]
    fn test_implied_kinds_closure() {
        let kinds: Vec<_> = PermissionKind::Admin.implied_kinds().collect();
        assert_eq!(
            kinds,
            vec![PermissionKind::Admin, PermissionKind::Edit, PermissionKind::View]
        );

        let kinds: Vec<_> = PermissionKind::View.implied_kinds().collect();
        assert_eq!(kinds, vec![PermissionKind::View]);
    }

    #[test]
    fn test_delay_days() {
        let event = DelayEvent {
            item: ItemId::new(1),
            original_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            new_date: NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
        };
        assert_eq!(event.delay_days(), 10);

        let pulled_in = DelayEvent {
            item: ItemId::new(1),
            original_date: NaiveDate::from_ymd_opt(2025, 3, 11).unwrap(),
            new_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        };
        assert_eq!(pulled_in.delay_days(), -10);
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&ItemStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let back: ItemStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(back, ItemStatus::Cancelled);
    }

    #[test]
    fn test_id_serializes_transparent() {
        let json = serde_json::to_string(&StreamId::new(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_effective_access_allows() {
        let access = EffectiveAccess {
            direct: vec![PermissionKind::Edit],
            inherited: vec![],
            effective: [PermissionKind::Edit, PermissionKind::View]
                .into_iter()
                .collect(),
        };
        assert!(access.allows(PermissionKind::View));
        assert!(access.allows(PermissionKind::Edit));
        assert!(!access.allows(PermissionKind::Admin));
    }
}
