//! Pre-flight validation of update requests.
//!
//! These checks run in the command-line driver before a request is handed to
//! the update handler. The handler itself only enforces the immutable-field
//! rule.

use std::collections::HashSet;
use tracing::debug;

use crate::error::{ReconcilerError, RequestError, Result};

use super::document::RequestDocument;
use super::snapshot::ResourceSnapshot;

/// Maximum length of a hierarchy group name.
const MAX_NAME_LEN: usize = 50;

/// Maximum length of a tag key.
const MAX_TAG_KEY_LEN: usize = 128;

/// Maximum length of a tag value.
const MAX_TAG_VALUE_LEN: usize = 256;

/// Tag key prefix reserved by the provider.
const RESERVED_TAG_PREFIX: &str = "aws:";

/// Validator for update requests.
#[derive(Debug, Default)]
pub struct SnapshotValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl SnapshotValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates an update request.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, document: &RequestDocument) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_snapshot(&document.desired_resource_state, "desiredResourceState", &mut result);
        Self::validate_snapshot(&document.previous_resource_state, "previousResourceState", &mut result);

        if document.desired_resource_state.group_arn().is_none() {
            result.warnings.push(String::from(
                "desiredResourceState.UserHierarchyGroupArn is absent; the previous identity will be used",
            ));
        }

        if result.errors.is_empty() {
            debug!("Request validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(ReconcilerError::Request(RequestError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )))
        }
    }

    /// Validates one snapshot.
    fn validate_snapshot(snapshot: &ResourceSnapshot, prefix: &str, result: &mut ValidationResult) {
        let instance = snapshot.instance();

        match instance {
            None => result.errors.push(ValidationError {
                field: format!("{prefix}.InstanceArn"),
                message: String::from("InstanceArn is required"),
            }),
            Some(arn) if !is_instance_arn(arn) => result.errors.push(ValidationError {
                field: format!("{prefix}.InstanceArn"),
                message: format!("'{arn}' is not a Connect instance ARN"),
            }),
            Some(_) => {}
        }

        match snapshot.display_name() {
            None => result.errors.push(ValidationError {
                field: format!("{prefix}.Name"),
                message: String::from("Name is required"),
            }),
            Some(name) if name.chars().count() > MAX_NAME_LEN => {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.Name"),
                    message: format!("Name exceeds {MAX_NAME_LEN} characters"),
                });
            }
            Some(_) => {}
        }

        if let Some(instance) = instance {
            for (field, arn) in [
                ("UserHierarchyGroupArn", snapshot.group_arn()),
                ("ParentGroupArn", snapshot.parent()),
            ] {
                if let Some(arn) = arn
                    && !is_group_arn_of(arn, instance)
                {
                    result.errors.push(ValidationError {
                        field: format!("{prefix}.{field}"),
                        message: format!("'{arn}' is not a hierarchy group of instance '{instance}'"),
                    });
                }
            }
        }

        if let (Some(group), Some(parent)) = (snapshot.group_arn(), snapshot.parent())
            && group == parent
        {
            result.errors.push(ValidationError {
                field: format!("{prefix}.ParentGroupArn"),
                message: String::from("A group cannot be its own parent"),
            });
        }

        Self::validate_tags(snapshot, prefix, result);
    }

    /// Validates tag keys and values.
    fn validate_tags(snapshot: &ResourceSnapshot, prefix: &str, result: &mut ValidationResult) {
        let mut seen_keys = HashSet::new();

        for (i, tag) in snapshot.tags.iter().enumerate() {
            if tag.key.is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.Tags[{i}].Key"),
                    message: String::from("Tag key cannot be empty"),
                });
            } else if tag.key.starts_with(RESERVED_TAG_PREFIX) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.Tags[{i}].Key"),
                    message: format!("Tag key '{}' uses the reserved '{RESERVED_TAG_PREFIX}' prefix", tag.key),
                });
            } else if tag.key.chars().count() > MAX_TAG_KEY_LEN {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.Tags[{i}].Key"),
                    message: format!("Tag key exceeds {MAX_TAG_KEY_LEN} characters"),
                });
            }

            if tag.value.chars().count() > MAX_TAG_VALUE_LEN {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.Tags[{i}].Value"),
                    message: format!("Tag value exceeds {MAX_TAG_VALUE_LEN} characters"),
                });
            }

            if !seen_keys.insert(tag.key.as_str()) {
                result.warnings.push(format!(
                    "{prefix}.Tags[{i}]: duplicate key '{}', the last value wins",
                    tag.key
                ));
            }
        }
    }
}

/// Checks the `arn:<partition>:connect:<region>:<account>:instance/<id>` shape.
fn is_instance_arn(arn: &str) -> bool {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    if parts.len() != 6 || parts[0] != "arn" || parts[2] != "connect" {
        return false;
    }
    if parts[1].is_empty() || parts[3].is_empty() || parts[4].is_empty() {
        return false;
    }

    parts[5]
        .strip_prefix("instance/")
        .is_some_and(|id| !id.is_empty() && !id.contains('/'))
}

/// Checks that a group ARN is `<instance-arn>/agent-group/<id>`.
fn is_group_arn_of(arn: &str, instance_arn: &str) -> bool {
    arn.strip_prefix(instance_arn)
        .and_then(|rest| rest.strip_prefix("/agent-group/"))
        .is_some_and(|id| !id.is_empty() && !id.contains('/'))
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTANCE_ARN: &str = "arn:aws:connect:us-west-2:111111111111:instance/instanceId";
    const GROUP_ARN: &str =
        "arn:aws:connect:us-west-2:111111111111:instance/instanceId/agent-group/userhierarchygroupId";
    const PARENT_ARN: &str =
        "arn:aws:connect:us-west-2:111111111111:instance/instanceId/agent-group/parenthierarchygroupId";

    fn valid_snapshot() -> ResourceSnapshot {
        ResourceSnapshot::new(INSTANCE_ARN, "userhierarchygroupName")
            .with_group_arn(GROUP_ARN)
            .with_parent(PARENT_ARN)
    }

    #[test]
    fn test_instance_arn_shape() {
        assert!(is_instance_arn(INSTANCE_ARN));
        assert!(!is_instance_arn("arn:aws:s3:::bucket"));
        assert!(!is_instance_arn("arn:aws:connect:us-west-2:111111111111:instance/"));
        assert!(!is_instance_arn(GROUP_ARN));
    }

    #[test]
    fn test_group_arn_belongs_to_instance() {
        assert!(is_group_arn_of(GROUP_ARN, INSTANCE_ARN));
        assert!(!is_group_arn_of(
            GROUP_ARN,
            "arn:aws:connect:us-west-2:111111111111:instance/other"
        ));
    }

    #[test]
    fn test_valid_request() {
        let document = RequestDocument::new(valid_snapshot(), valid_snapshot());
        let result = SnapshotValidator::new().validate(&document).unwrap();
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_name_too_long() {
        let mut desired = valid_snapshot();
        desired.name = Some("x".repeat(51));
        let document = RequestDocument::new(desired, valid_snapshot());
        assert!(SnapshotValidator::new().validate(&document).is_err());
    }

    #[test]
    fn test_reserved_tag_prefix() {
        let desired = valid_snapshot().with_tag("aws:cloudformation:stack-name", "s");
        let document = RequestDocument::new(desired, valid_snapshot());
        let err = SnapshotValidator::new().validate(&document).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_self_parent_rejected() {
        let desired = valid_snapshot().with_parent(GROUP_ARN);
        let document = RequestDocument::new(desired, valid_snapshot());
        assert!(SnapshotValidator::new().validate(&document).is_err());
    }

    #[test]
    fn test_missing_desired_identity_is_warning() {
        let mut desired = valid_snapshot();
        desired.user_hierarchy_group_arn = None;
        let document = RequestDocument::new(desired, valid_snapshot());
        let result = SnapshotValidator::new().validate(&document).unwrap();
        assert_eq!(result.warning_count(), 1);
    }
}
