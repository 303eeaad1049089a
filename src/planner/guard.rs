//! Immutable-field guard.
//!
//! Runs before anything else in an update. A rejected update makes no remote
//! call at all.

use tracing::warn;

use crate::error::HandlerError;
use crate::model::{fields_equal, ResourceSnapshot};

/// Precondition check for fields that cannot change once a group exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmutableFieldGuard;

impl ImmutableFieldGuard {
    /// Creates a new guard.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Rejects the update if the owning instance changed.
    ///
    /// An absent or empty desired instance means "unchanged" and passes.
    ///
    /// # Errors
    ///
    /// Returns `ImmutableField` if the desired instance is set and differs
    /// from the previous one.
    pub fn check(&self, previous: &ResourceSnapshot, desired: &ResourceSnapshot) -> Result<(), HandlerError> {
        if desired.instance().is_some() && !fields_equal(desired.instance(), previous.instance()) {
            warn!(
                "Rejecting update of {}: instance changed from {} to {}",
                previous.label(),
                previous.instance().unwrap_or("<none>"),
                desired.instance().unwrap_or("<none>")
            );
            let resource = desired
                .group_arn()
                .or_else(|| previous.group_arn())
                .map_or_else(|| previous.label(), str::to_string);
            return Err(HandlerError::ImmutableField {
                field: "InstanceArn",
                resource,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTANCE: &str = "arn:aws:connect:us-west-2:111111111111:instance/instance-1";
    const OTHER_INSTANCE: &str = "arn:aws:connect:us-west-2:111111111111:instance/instance-2";
    const GROUP: &str = "arn:aws:connect:us-west-2:111111111111:instance/instance-1/agent-group/group-1";

    #[test]
    fn test_same_instance_passes() {
        let previous = ResourceSnapshot::new(INSTANCE, "team");
        let desired = ResourceSnapshot::new(INSTANCE, "renamed");
        assert!(ImmutableFieldGuard::new().check(&previous, &desired).is_ok());
    }

    #[test]
    fn test_absent_desired_instance_passes() {
        let previous = ResourceSnapshot::new(INSTANCE, "team");
        let mut desired = previous.clone();
        desired.instance_arn = None;
        assert!(ImmutableFieldGuard::new().check(&previous, &desired).is_ok());

        desired.instance_arn = Some(String::new());
        assert!(ImmutableFieldGuard::new().check(&previous, &desired).is_ok());
    }

    #[test]
    fn test_changed_instance_rejected() {
        let previous = ResourceSnapshot::new(INSTANCE, "team").with_group_arn(GROUP);
        let desired = ResourceSnapshot::new(OTHER_INSTANCE, "team").with_group_arn(GROUP);

        let err = ImmutableFieldGuard::new().check(&previous, &desired).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("InstanceArn cannot be updated for UserHierarchyGroup:{GROUP}.")
        );
    }

    #[test]
    fn test_rejection_names_group_by_name_without_identity() {
        let previous = ResourceSnapshot::new(INSTANCE, "team");
        let desired = ResourceSnapshot::new(OTHER_INSTANCE, "team");

        let err = ImmutableFieldGuard::new().check(&previous, &desired).unwrap_err();
        assert!(err.to_string().ends_with("UserHierarchyGroup:team."));
    }

    #[test]
    fn test_instance_added_where_previous_had_none_rejected() {
        let mut previous = ResourceSnapshot::new(INSTANCE, "team");
        previous.instance_arn = None;
        let desired = ResourceSnapshot::new(INSTANCE, "team");
        assert!(ImmutableFieldGuard::new().check(&previous, &desired).is_err());
    }
}
