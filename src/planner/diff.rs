//! Change detection between previous and desired snapshots.
//!
//! Only the two mutable structural fields are compared here. Tags have their
//! own diff in [`super::tags`].

use serde::Serialize;
use tracing::debug;

use crate::model::{fields_equal, ResourceSnapshot};

/// Detects which structural fields changed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChangeDetector;

/// Kind of structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChangeKind {
    /// The display name changed.
    Rename,
    /// The parent group changed.
    Reparent,
}

/// A single changed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    /// Kind of change.
    pub kind: ChangeKind,
    /// Previous value.
    pub old: Option<String>,
    /// Desired value.
    pub new: Option<String>,
}

/// Ordered set of structural changes: rename before reparent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    /// Changed fields in application order.
    pub changes: Vec<FieldChange>,
}

impl ChangeDetector {
    /// Creates a new change detector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Compares the two snapshots.
    ///
    /// Both comparisons are null-safe: absent and empty values are equal.
    #[must_use]
    pub fn detect(&self, previous: &ResourceSnapshot, desired: &ResourceSnapshot) -> ChangeSet {
        let mut changes = Vec::new();

        if fields_equal(previous.name.as_deref(), desired.name.as_deref()) {
            debug!("Name unchanged for {}", desired.label());
        } else {
            changes.push(FieldChange {
                kind: ChangeKind::Rename,
                old: previous.display_name().map(str::to_string),
                new: desired.display_name().map(str::to_string),
            });
        }

        if fields_equal(previous.parent_group_arn.as_deref(), desired.parent_group_arn.as_deref()) {
            debug!("Parent unchanged for {}", desired.label());
        } else {
            changes.push(FieldChange {
                kind: ChangeKind::Reparent,
                old: previous.parent().map(str::to_string),
                new: desired.parent().map(str::to_string),
            });
        }

        ChangeSet { changes }
    }
}

impl ChangeSet {
    /// Returns true if no structural field changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns true if a change of the given kind is present.
    #[must_use]
    pub fn requires(&self, kind: ChangeKind) -> bool {
        self.changes.iter().any(|c| c.kind == kind)
    }

    /// Returns the change of the given kind, if any.
    #[must_use]
    pub fn get(&self, kind: ChangeKind) -> Option<&FieldChange> {
        self.changes.iter().find(|c| c.kind == kind)
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rename => write!(f, "rename"),
            Self::Reparent => write!(f, "reparent"),
        }
    }
}

impl std::fmt::Display for FieldChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.kind,
            self.old.as_deref().unwrap_or("<none>"),
            self.new.as_deref().unwrap_or("<none>")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTANCE: &str = "arn:aws:connect:us-west-2:111111111111:instance/instance-1";
    const PARENT_1: &str = "arn:aws:connect:us-west-2:111111111111:instance/instance-1/agent-group/parent-1";
    const PARENT_2: &str = "arn:aws:connect:us-west-2:111111111111:instance/instance-1/agent-group/parent-2";

    fn group(name: &str) -> ResourceSnapshot {
        ResourceSnapshot::new(INSTANCE, name).with_group_arn("arn:group")
    }

    #[test]
    fn test_no_changes() {
        let previous = group("team").with_parent(PARENT_1);
        let desired = previous.clone();
        assert!(ChangeDetector::new().detect(&previous, &desired).is_empty());
    }

    #[test]
    fn test_rename_only() {
        let changes = ChangeDetector::new().detect(&group("team"), &group("renamed"));
        assert_eq!(changes.changes.len(), 1);
        assert!(changes.requires(ChangeKind::Rename));
        assert!(!changes.requires(ChangeKind::Reparent));

        let change = changes.get(ChangeKind::Rename).unwrap();
        assert_eq!(change.old.as_deref(), Some("team"));
        assert_eq!(change.new.as_deref(), Some("renamed"));
        assert_eq!(change.to_string(), "rename: team -> renamed");
    }

    #[test]
    fn test_reparent_only() {
        let previous = group("team").with_parent(PARENT_1);
        let desired = group("team").with_parent(PARENT_2);
        let changes = ChangeDetector::new().detect(&previous, &desired);
        assert_eq!(changes.changes.len(), 1);
        assert!(changes.requires(ChangeKind::Reparent));
    }

    #[test]
    fn test_both_changes_in_order() {
        let previous = group("team").with_parent(PARENT_1);
        let desired = group("renamed").with_parent(PARENT_2);
        let kinds: Vec<_> = ChangeDetector::new()
            .detect(&previous, &desired)
            .changes
            .iter()
            .map(|c| c.kind)
            .collect();
        assert_eq!(kinds, vec![ChangeKind::Rename, ChangeKind::Reparent]);
    }

    #[test]
    fn test_null_and_empty_are_equal() {
        let mut previous = group("team");
        previous.parent_group_arn = None;
        let mut desired = group("team");
        desired.parent_group_arn = Some(String::new());
        assert!(ChangeDetector::new().detect(&previous, &desired).is_empty());
    }

    #[test]
    fn test_parent_removed_is_reparent() {
        let previous = group("team").with_parent(PARENT_1);
        let desired = group("team");
        let changes = ChangeDetector::new().detect(&previous, &desired);
        let change = changes.get(ChangeKind::Reparent).unwrap();
        assert_eq!(change.new, None);
        assert_eq!(change.to_string(), format!("reparent: {PARENT_1} -> <none>"));
    }
}
