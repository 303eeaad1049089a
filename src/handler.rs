//! Update handler for user hierarchy groups.
//!
//! This is the entry point the workflow engine calls. One invocation guards
//! immutable fields, detects changes, plans the remote steps, runs as many as
//! the step budget allows, and reports where the update stands.

use serde::Serialize;
use tracing::{error, info};

use crate::context::{CallbackContext, ReconcileProgress};
use crate::error::{ErrorKind, ReconcilerError, Result};
use crate::model::{RequestDocument, RequestFingerprint, ResourceSnapshot};
use crate::planner::{
    ChangeDetector, ChangeKind, ImmutableFieldGuard, PlanOptions, ReconcilePlan, Sequencer,
    TagReconciliation,
};
use crate::remote::RemoteInvoker;

/// Options for the update handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlerOptions {
    /// Tag reconciliation position.
    pub tag_reconciliation: TagReconciliation,
    /// Maximum remote calls per invocation; `None` runs every step.
    pub step_budget: Option<usize>,
}

/// Where an update stands after one invocation.
///
/// Serialized as `{"status": ..., "detail": ...}` so context slots never
/// collide with the status key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail")]
pub enum ProgressOutcome {
    /// Steps remain; invoke again with this context.
    InProgress(CallbackContext),
    /// The group matches the desired state.
    Success(ResourceSnapshot),
    /// The update stopped at a failure.
    Failed {
        /// Failure taxonomy.
        kind: ErrorKind,
        /// Message naming the resource and the failed operation.
        message: String,
    },
}

/// Update handler.
#[derive(Debug)]
pub struct UpdateHandler<I: RemoteInvoker> {
    /// Remote invoker.
    invoker: I,
    /// Handler options.
    options: HandlerOptions,
    /// Immutable-field guard.
    guard: ImmutableFieldGuard,
    /// Change detector.
    detector: ChangeDetector,
    /// Request fingerprint hasher.
    fingerprint: RequestFingerprint,
}

impl ProgressOutcome {
    /// Returns true for `Success`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true for `Success` and `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress(_))
    }

    /// Failure kind, if the update failed.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    fn failed(err: &ReconcilerError) -> Self {
        let message = match err {
            ReconcilerError::Handler(inner) => inner.to_string(),
            other => other.to_string(),
        };
        Self::Failed {
            kind: err.kind(),
            message,
        }
    }
}

impl<I: RemoteInvoker> UpdateHandler<I> {
    /// Creates a new handler with default options.
    #[must_use]
    pub fn new(invoker: I) -> Self {
        Self::with_options(invoker, HandlerOptions::default())
    }

    /// Creates a new handler with the given options.
    #[must_use]
    pub const fn with_options(invoker: I, options: HandlerOptions) -> Self {
        Self {
            invoker,
            options,
            guard: ImmutableFieldGuard::new(),
            detector: ChangeDetector::new(),
            fingerprint: RequestFingerprint::new(),
        }
    }

    /// Returns the invoker.
    #[must_use]
    pub const fn invoker(&self) -> &I {
        &self.invoker
    }

    /// Returns the handler options.
    #[must_use]
    pub const fn options(&self) -> &HandlerOptions {
        &self.options
    }

    /// Plans an update without running it.
    ///
    /// # Errors
    ///
    /// Returns an error if an immutable field changed or the change cannot be
    /// expressed as remote calls.
    pub fn plan(&self, desired: &ResourceSnapshot, previous: &ResourceSnapshot) -> Result<ReconcilePlan> {
        self.guard.check(previous, desired)?;

        let changes = self.detector.detect(previous, desired);
        let label = desired.label();

        match changes.get(ChangeKind::Rename) {
            Some(change) => info!("Name changed for UserHierarchyGroup:{label} ({change})"),
            None => info!(
                "UserHierarchyGroup name field is unchanged, skipping UpdateUserHierarchyGroupName for UserHierarchyGroup:{label}"
            ),
        }
        match changes.get(ChangeKind::Reparent) {
            Some(change) => info!("Parent changed for UserHierarchyGroup:{label} ({change})"),
            None => info!(
                "UserHierarchyGroup parent group arn field is unchanged, skipping recreate for UserHierarchyGroup:{label}"
            ),
        }

        let options = PlanOptions {
            tag_reconciliation: self.options.tag_reconciliation,
        };
        Ok(ReconcilePlan::build(previous, desired, &changes, &options)?)
    }

    /// Handles one invocation of an update.
    ///
    /// Progress is written into `context` whether or not the invocation
    /// succeeds, so re-invoking with the same context resumes after the last
    /// completed step.
    pub async fn handle(
        &self,
        desired: &ResourceSnapshot,
        previous: &ResourceSnapshot,
        context: &mut CallbackContext,
    ) -> ProgressOutcome {
        info!(
            "Invoked update handler with UserHierarchyGroup:{} via {} invoker",
            desired.label(),
            self.invoker.invoker_name()
        );

        match self.run(desired, previous, context).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Update of UserHierarchyGroup:{} failed: {err}", desired.label());
                ProgressOutcome::failed(&err)
            }
        }
    }

    /// Handles one invocation for a request document.
    pub async fn handle_document(&self, document: &RequestDocument, context: &mut CallbackContext) -> ProgressOutcome {
        self.handle(
            &document.desired_resource_state,
            &document.previous_resource_state,
            context,
        )
        .await
    }

    async fn run(
        &self,
        desired: &ResourceSnapshot,
        previous: &ResourceSnapshot,
        context: &mut CallbackContext,
    ) -> Result<ProgressOutcome> {
        let mut plan = self.plan(desired, previous)?;

        if plan.is_empty() {
            info!("No remote calls needed for UserHierarchyGroup:{}", desired.label());
            return Ok(ProgressOutcome::Success(desired.clone()));
        }

        let fingerprint = self.fingerprint.of_request(previous, desired);
        let mut progress = ReconcileProgress::for_request(context, &fingerprint)?;
        plan.resume_from(&progress);

        let result = Sequencer::new(&self.invoker)
            .with_step_budget(self.options.step_budget)
            .execute(&plan, &mut progress)
            .await;

        // Recorded before the step error surfaces so a retry can resume
        let stored = progress.store(context);
        let report = result?;
        stored?;

        if !report.finished {
            info!(
                "UserHierarchyGroup:{} in progress, {} step(s) done this invocation",
                plan.resource,
                report.invoked.len()
            );
            return Ok(ProgressOutcome::InProgress(context.clone()));
        }

        let mut snapshot = desired.clone();
        if let Some(arn) = report.replacement_arn {
            info!("UserHierarchyGroup:{} replaced by {arn}", plan.resource);
            snapshot.user_hierarchy_group_arn = Some(arn);
        }

        info!("Update of UserHierarchyGroup:{} succeeded", plan.resource);
        Ok(ProgressOutcome::Success(snapshot))
    }
}
