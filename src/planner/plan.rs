//! Reconcile plan types and construction.
//!
//! This module turns a change set into an ordered list of remote steps. The
//! order is fixed: rename the original group, then recreate it under the new
//! parent, then delete the original. Tag steps, when enabled, go before or
//! after the structural steps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::context::ReconcileProgress;
use crate::error::HandlerError;
use crate::model::ResourceSnapshot;
use crate::remote::{
    CreateGroupRequest, DeleteGroupRequest, RemoteRequest, TagResourceRequest, UntagResourceRequest,
    UpdateGroupNameRequest,
};

use super::diff::{ChangeKind, ChangeSet};
use super::tags::TagDiff;

/// Where tag reconciliation runs, if at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagReconciliation {
    /// Tags are not reconciled.
    #[default]
    Disabled,
    /// Untag and tag run before rename.
    #[serde(rename = "before")]
    BeforeStructural,
    /// Untag and tag run after rename.
    #[serde(rename = "after")]
    AfterStructural,
}

/// Options that shape a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Tag reconciliation position.
    pub tag_reconciliation: TagReconciliation,
}

/// A logical operation on the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// Rename the group in place.
    Rename {
        /// Group being renamed.
        identity: String,
        /// New name.
        name: String,
    },
    /// Move the group by creating a replacement and deleting the original.
    RecreateMove {
        /// Identity of the replacement, once created.
        new_identity: Option<String>,
        /// Identity of the original group.
        old_identity: String,
    },
    /// Remove tags by key.
    Untag {
        /// Keys to remove.
        keys: Vec<String>,
    },
    /// Add or overwrite tags.
    Tag {
        /// Tags to apply.
        tags: BTreeMap<String, String>,
    },
}

/// Key under which a step's completion is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StepKey {
    /// Rename call.
    Rename,
    /// Create half of a recreate.
    RecreateCreate,
    /// Delete half of a recreate.
    RecreateDelete,
    /// Untag call.
    Untag,
    /// Tag call.
    Tag,
}

/// One remote call in a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    /// Progress key.
    pub key: StepKey,
    /// Request to issue.
    pub request: RemoteRequest,
}

/// Ordered remote steps for one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Identity used in logs and error messages.
    pub resource: String,
    /// Logical operations in order.
    pub operations: Vec<Operation>,
    /// Remote steps in order.
    pub steps: Vec<PlannedStep>,
}

impl TagReconciliation {
    /// Returns true unless tag reconciliation is disabled.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl StepKey {
    /// Key as recorded in the callback context.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rename => "rename",
            Self::RecreateCreate => "recreate.create",
            Self::RecreateDelete => "recreate.delete",
            Self::Untag => "untag",
            Self::Tag => "tag",
        }
    }
}

impl ReconcilePlan {
    /// Builds the plan for an update.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUpdate` when a required change cannot be expressed as
    /// remote calls: no owning instance, no desired name for a rename or
    /// recreate, no previous identity to delete, or no identity to tag.
    pub fn build(
        previous: &ResourceSnapshot,
        desired: &ResourceSnapshot,
        changes: &ChangeSet,
        options: &PlanOptions,
    ) -> Result<Self, HandlerError> {
        let identity = desired.group_arn().or_else(|| previous.group_arn());
        let mut plan = Self {
            resource: identity.map_or_else(|| desired.label(), str::to_string),
            operations: Vec::new(),
            steps: Vec::new(),
        };

        let rename = changes.requires(ChangeKind::Rename);
        let reparent = changes.requires(ChangeKind::Reparent);

        // The replacement group is created with the desired tags already on it
        let tag_diff = if options.tag_reconciliation.is_enabled() && !reparent {
            TagDiff::between(&previous.tag_set(), &desired.tag_set())
        } else {
            TagDiff::default()
        };

        if !rename && !reparent && tag_diff.is_empty() {
            return Ok(plan);
        }

        let instance = desired
            .instance()
            .or_else(|| previous.instance())
            .ok_or_else(|| plan.invalid("owning instance is absent"))?
            .to_string();

        if options.tag_reconciliation == TagReconciliation::BeforeStructural {
            plan.push_tag_steps(identity, &tag_diff)?;
        }

        if rename {
            let target = identity.ok_or_else(|| plan.invalid("no group identity to rename"))?;
            let name = desired
                .display_name()
                .ok_or_else(|| plan.invalid("desired name is absent"))?;

            plan.operations.push(Operation::Rename {
                identity: target.to_string(),
                name: name.to_string(),
            });
            plan.steps.push(PlannedStep {
                key: StepKey::Rename,
                request: RemoteRequest::RenameGroup(UpdateGroupNameRequest {
                    instance_id: instance.clone(),
                    hierarchy_group_id: target.to_string(),
                    name: name.to_string(),
                }),
            });
        }

        if reparent {
            // Same name the rename step applied, not the previous one
            let name = desired
                .display_name()
                .ok_or_else(|| plan.invalid("desired name is absent"))?;
            let old_identity = previous
                .group_arn()
                .ok_or_else(|| plan.invalid("previous group identity is absent, cannot recreate"))?;
            let tags = if options.tag_reconciliation.is_enabled() {
                desired.tag_set().to_map()
            } else {
                BTreeMap::new()
            };

            plan.operations.push(Operation::RecreateMove {
                new_identity: None,
                old_identity: old_identity.to_string(),
            });
            plan.steps.push(PlannedStep {
                key: StepKey::RecreateCreate,
                request: RemoteRequest::CreateGroup(CreateGroupRequest {
                    instance_id: instance.clone(),
                    name: name.to_string(),
                    parent_group_id: desired.parent().map(str::to_string),
                    tags,
                }),
            });
            plan.steps.push(PlannedStep {
                key: StepKey::RecreateDelete,
                request: RemoteRequest::DeleteGroup(DeleteGroupRequest {
                    instance_id: instance,
                    hierarchy_group_id: old_identity.to_string(),
                }),
            });
        }

        if options.tag_reconciliation == TagReconciliation::AfterStructural {
            plan.push_tag_steps(identity, &tag_diff)?;
        }

        Ok(plan)
    }

    /// Fills in what earlier invocations already learned.
    pub fn resume_from(&mut self, progress: &ReconcileProgress) {
        for operation in &mut self.operations {
            if let Operation::RecreateMove { new_identity, .. } = operation
                && new_identity.is_none()
            {
                new_identity.clone_from(&progress.replacement_arn);
            }
        }
    }

    /// Returns true if the plan has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of remote steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Step keys in order.
    #[must_use]
    pub fn step_keys(&self) -> Vec<StepKey> {
        self.steps.iter().map(|s| s.key).collect()
    }

    /// Appends untag then tag, skipping whichever is empty.
    fn push_tag_steps(&mut self, identity: Option<&str>, diff: &TagDiff) -> Result<(), HandlerError> {
        if diff.is_empty() {
            return Ok(());
        }
        let target = identity.ok_or_else(|| self.invalid("no group identity to tag"))?;

        if !diff.to_remove.is_empty() {
            let keys = diff.untag_keys();
            self.operations.push(Operation::Untag { keys: keys.clone() });
            self.steps.push(PlannedStep {
                key: StepKey::Untag,
                request: RemoteRequest::UntagResource(UntagResourceRequest {
                    resource_arn: target.to_string(),
                    tag_keys: keys,
                }),
            });
        }

        if !diff.to_add.is_empty() {
            self.operations.push(Operation::Tag {
                tags: diff.to_add.clone(),
            });
            self.steps.push(PlannedStep {
                key: StepKey::Tag,
                request: RemoteRequest::TagResource(TagResourceRequest {
                    resource_arn: target.to_string(),
                    tags: diff.to_add.clone(),
                }),
            });
        }

        Ok(())
    }

    fn invalid(&self, reason: &str) -> HandlerError {
        HandlerError::InvalidUpdate {
            resource: self.resource.clone(),
            reason: reason.to_string(),
        }
    }
}

impl FromStr for TagReconciliation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disabled" | "off" | "false" | "none" => Ok(Self::Disabled),
            "before" | "before-structural" => Ok(Self::BeforeStructural),
            "after" | "after-structural" => Ok(Self::AfterStructural),
            other => Err(format!(
                "unknown tag reconciliation mode '{other}', expected disabled, before or after"
            )),
        }
    }
}

impl std::fmt::Display for TagReconciliation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::BeforeStructural => write!(f, "before"),
            Self::AfterStructural => write!(f, "after"),
        }
    }
}

impl std::fmt::Display for StepKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for ReconcilePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.steps.is_empty() {
            return writeln!(f, "No changes for {}", self.resource);
        }

        writeln!(f, "Plan for {} ({} steps):", self.resource, self.steps.len())?;
        for (i, step) in self.steps.iter().enumerate() {
            writeln!(f, "  {}. [{}] {}", i + 1, step.key, step.request)?;
        }
        Ok(())
    }
}
