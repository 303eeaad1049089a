//! Reconciliation progress kept in callback context slots.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::error::ContextError;

use super::types::CallbackContext;

/// Slot holding the fingerprint of the request the progress belongs to.
pub const SLOT_REQUEST_FINGERPRINT: &str = "request_fingerprint";

/// Slot holding the keys of completed steps.
pub const SLOT_COMPLETED_STEPS: &str = "completed_steps";

/// Slot holding the identity allocated by a recreate.
pub const SLOT_REPLACEMENT_GROUP_ARN: &str = "replacement_group_arn";

/// Slot holding the time of the last completed step.
pub const SLOT_LAST_PROGRESS_AT: &str = "last_progress_at";

/// Typed view over the progress slots of a [`CallbackContext`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileProgress {
    /// Fingerprint of the request this progress belongs to.
    pub fingerprint: Option<String>,
    /// Keys of completed steps.
    pub completed: BTreeSet<String>,
    /// Identity of the group created by a recreate, once known.
    pub replacement_arn: Option<String>,
    /// When the last step completed.
    pub last_progress_at: Option<DateTime<Utc>>,
}

impl ReconcileProgress {
    /// Reads progress slots from a context.
    ///
    /// # Errors
    ///
    /// Returns an error if a progress slot is malformed.
    pub fn load(context: &CallbackContext) -> Result<Self, ContextError> {
        Ok(Self {
            fingerprint: context.get(SLOT_REQUEST_FINGERPRINT)?,
            completed: context.get(SLOT_COMPLETED_STEPS)?.unwrap_or_default(),
            replacement_arn: context.get(SLOT_REPLACEMENT_GROUP_ARN)?,
            last_progress_at: context.get(SLOT_LAST_PROGRESS_AT)?,
        })
    }

    /// Reads progress for a specific request.
    ///
    /// Progress recorded for a different request is discarded so that steps
    /// are never skipped on the strength of someone else's update.
    ///
    /// # Errors
    ///
    /// Returns an error if a progress slot is malformed.
    pub fn for_request(context: &CallbackContext, fingerprint: &str) -> Result<Self, ContextError> {
        let progress = Self::load(context)?;

        match progress.fingerprint.as_deref() {
            Some(existing) if existing == fingerprint => {
                debug!(
                    "Resuming with {} completed step(s)",
                    progress.completed.len()
                );
                Ok(progress)
            }
            Some(_) => {
                warn!("Callback context belongs to a different request, discarding its progress");
                Ok(Self::fresh(fingerprint))
            }
            None => Ok(Self::fresh(fingerprint)),
        }
    }

    /// Creates empty progress for a request.
    #[must_use]
    pub fn fresh(fingerprint: &str) -> Self {
        Self {
            fingerprint: Some(fingerprint.to_string()),
            ..Self::default()
        }
    }

    /// Writes progress slots into a context. Other slots are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be encoded.
    pub fn store(&self, context: &mut CallbackContext) -> Result<(), ContextError> {
        match &self.fingerprint {
            Some(fingerprint) => context.set(SLOT_REQUEST_FINGERPRINT, fingerprint)?,
            None => {
                context.remove(SLOT_REQUEST_FINGERPRINT);
            }
        }

        context.set(SLOT_COMPLETED_STEPS, &self.completed)?;

        match &self.replacement_arn {
            Some(arn) => context.set(SLOT_REPLACEMENT_GROUP_ARN, arn)?,
            None => {
                context.remove(SLOT_REPLACEMENT_GROUP_ARN);
            }
        }

        match &self.last_progress_at {
            Some(at) => context.set(SLOT_LAST_PROGRESS_AT, at)?,
            None => {
                context.remove(SLOT_LAST_PROGRESS_AT);
            }
        }

        Ok(())
    }

    /// Returns true if the step has already completed.
    #[must_use]
    pub fn is_completed(&self, step: &str) -> bool {
        self.completed.contains(step)
    }

    /// Records a completed step.
    pub fn mark_completed(&mut self, step: &str) {
        self.completed.insert(step.to_string());
        self.last_progress_at = Some(Utc::now());
    }
}
