//! Wire request and response types for hierarchy group operations.
//!
//! One request struct per remote operation. Identifiers are passed exactly as
//! they appear in the resource model; the service accepts ARNs wherever it
//! accepts ids.

use serde::Serialize;
use std::collections::BTreeMap;

/// Remote operations the reconciler can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationKind {
    /// Rename a group in place.
    RenameGroup,
    /// Create a group.
    CreateGroup,
    /// Delete a group.
    DeleteGroup,
    /// Add or overwrite tags.
    TagResource,
    /// Remove tags by key.
    UntagResource,
}

/// Request for `UpdateUserHierarchyGroupName`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateGroupNameRequest {
    /// Owning instance.
    pub instance_id: String,
    /// Group to rename.
    pub hierarchy_group_id: String,
    /// New display name.
    pub name: String,
}

/// Request for `CreateUserHierarchyGroup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateGroupRequest {
    /// Owning instance.
    pub instance_id: String,
    /// Display name.
    pub name: String,
    /// Parent group; `None` creates a top-level group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<String>,
    /// Tags applied at creation.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Request for `DeleteUserHierarchyGroup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteGroupRequest {
    /// Owning instance.
    pub instance_id: String,
    /// Group to delete.
    pub hierarchy_group_id: String,
}

/// Request for `TagResource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagResourceRequest {
    /// Resource to tag.
    pub resource_arn: String,
    /// Tags to add or overwrite.
    pub tags: BTreeMap<String, String>,
}

/// Request for `UntagResource`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UntagResourceRequest {
    /// Resource to untag.
    pub resource_arn: String,
    /// Keys to remove.
    pub tag_keys: Vec<String>,
}

/// A single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation")]
pub enum RemoteRequest {
    /// Rename a group.
    RenameGroup(UpdateGroupNameRequest),
    /// Create a group.
    CreateGroup(CreateGroupRequest),
    /// Delete a group.
    DeleteGroup(DeleteGroupRequest),
    /// Tag a resource.
    TagResource(TagResourceRequest),
    /// Untag a resource.
    UntagResource(UntagResourceRequest),
}

/// Outcome of a successful remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RemoteResponse {
    /// The call succeeded and returned nothing of interest.
    Acknowledged,
    /// A group was created.
    Created {
        /// Identifier assigned by the service.
        group_id: Option<String>,
        /// ARN assigned by the service.
        group_arn: Option<String>,
    },
}

impl OperationKind {
    /// Service API name of the operation.
    #[must_use]
    pub const fn api_name(self) -> &'static str {
        match self {
            Self::RenameGroup => "UpdateUserHierarchyGroupName",
            Self::CreateGroup => "CreateUserHierarchyGroup",
            Self::DeleteGroup => "DeleteUserHierarchyGroup",
            Self::TagResource => "TagResource",
            Self::UntagResource => "UntagResource",
        }
    }
}

impl RemoteRequest {
    /// Operation this request performs.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        match self {
            Self::RenameGroup(_) => OperationKind::RenameGroup,
            Self::CreateGroup(_) => OperationKind::CreateGroup,
            Self::DeleteGroup(_) => OperationKind::DeleteGroup,
            Self::TagResource(_) => OperationKind::TagResource,
            Self::UntagResource(_) => OperationKind::UntagResource,
        }
    }

    /// Identity the request acts on, for logs and error messages.
    ///
    /// A create has no identity yet, so its owning instance is reported.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::RenameGroup(req) => &req.hierarchy_group_id,
            Self::CreateGroup(req) => &req.instance_id,
            Self::DeleteGroup(req) => &req.hierarchy_group_id,
            Self::TagResource(req) => &req.resource_arn,
            Self::UntagResource(req) => &req.resource_arn,
        }
    }
}

impl RemoteResponse {
    /// Identity of a created group, preferring the ARN.
    #[must_use]
    pub fn created_identity(&self) -> Option<&str> {
        match self {
            Self::Created { group_id, group_arn } => group_arn.as_deref().or(group_id.as_deref()),
            Self::Acknowledged => None,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.api_name())
    }
}

impl std::fmt::Display for RemoteRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RenameGroup(req) => write!(f, "{} {} -> '{}'", self.kind(), req.hierarchy_group_id, req.name),
            Self::CreateGroup(req) => write!(
                f,
                "{} '{}' under {}",
                self.kind(),
                req.name,
                req.parent_group_id.as_deref().unwrap_or("<top level>")
            ),
            Self::DeleteGroup(req) => write!(f, "{} {}", self.kind(), req.hierarchy_group_id),
            Self::TagResource(req) => write!(f, "{} {} ({} tags)", self.kind(), req.resource_arn, req.tags.len()),
            Self::UntagResource(req) => {
                write!(f, "{} {} [{}]", self.kind(), req.resource_arn, req.tag_keys.join(", "))
            }
        }
    }
}
