//! Operation sequencer.
//!
//! Runs plan steps strictly in order, one remote call at a time. The first
//! failure stops the sequence; later steps are not attempted. Completed steps
//! are recorded in the progress so a re-entered reconciliation of the same
//! request skips them.

use tracing::{debug, error, info, warn};

use crate::context::ReconcileProgress;
use crate::error::HandlerError;
use crate::remote::RemoteInvoker;

use super::plan::{ReconcilePlan, StepKey};

/// Sequencer for reconcile plans.
#[derive(Debug)]
pub struct Sequencer<'a, I: RemoteInvoker + ?Sized> {
    /// Remote invoker.
    invoker: &'a I,
    /// Maximum remote calls per invocation.
    step_budget: Option<usize>,
}

/// Result of running a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Steps invoked in this run, in order.
    pub invoked: Vec<StepKey>,
    /// Steps skipped because an earlier run completed them.
    pub skipped: Vec<StepKey>,
    /// Whether every step has now completed.
    pub finished: bool,
    /// Identity of the replacement group, if a recreate has created one.
    pub replacement_arn: Option<String>,
}

impl<'a, I: RemoteInvoker + ?Sized> Sequencer<'a, I> {
    /// Creates a new sequencer without a step budget.
    #[must_use]
    pub const fn new(invoker: &'a I) -> Self {
        Self {
            invoker,
            step_budget: None,
        }
    }

    /// Limits the number of remote calls per run. Zero means unlimited.
    #[must_use]
    pub const fn with_step_budget(mut self, step_budget: Option<usize>) -> Self {
        self.step_budget = match step_budget {
            Some(0) => None,
            other => other,
        };
        self
    }

    /// Executes the plan.
    ///
    /// Returns a report with `finished == false` when the step budget ran out
    /// before the last step.
    ///
    /// # Errors
    ///
    /// Returns `StepFailed` for the first remote call that fails. Progress of
    /// the steps before it is kept in `progress`.
    pub async fn execute(
        &self,
        plan: &ReconcilePlan,
        progress: &mut ReconcileProgress,
    ) -> Result<ExecutionReport, HandlerError> {
        let mut report = ExecutionReport {
            replacement_arn: progress.replacement_arn.clone(),
            ..ExecutionReport::default()
        };

        if plan.is_empty() {
            report.finished = true;
            return Ok(report);
        }

        info!("Executing {} step(s) for {}", plan.len(), plan.resource);

        for (idx, step) in plan.steps.iter().enumerate() {
            if progress.is_completed(step.key.as_str()) {
                debug!("Step {} already completed, skipping", step.key);
                report.skipped.push(step.key);
                continue;
            }

            if let Some(budget) = self.step_budget
                && report.invoked.len() >= budget
            {
                info!(
                    "Step budget of {budget} reached with {} step(s) remaining for {}",
                    plan.len() - idx,
                    plan.resource
                );
                return Ok(report);
            }

            info!("Calling {} for {}", step.request.kind(), plan.resource);

            match self.invoker.invoke(step.request.clone()).await {
                Ok(response) => {
                    if step.key == StepKey::RecreateCreate {
                        match response.created_identity() {
                            Some(identity) => {
                                info!("Created replacement group {identity}");
                                progress.replacement_arn = Some(identity.to_string());
                                report.replacement_arn = Some(identity.to_string());
                            }
                            None => warn!("Create returned no identity for {}", plan.resource),
                        }
                    }
                    progress.mark_completed(step.key.as_str());
                    report.invoked.push(step.key);
                }
                Err(source) => {
                    error!("Step {} failed for {}: {source}", step.key, plan.resource);
                    return Err(HandlerError::StepFailed {
                        step: step.key.to_string(),
                        resource: plan.resource.clone(),
                        source,
                    });
                }
            }
        }

        report.finished = true;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, RemoteError};
    use crate::model::ResourceSnapshot;
    use crate::planner::diff::ChangeDetector;
    use crate::planner::plan::PlanOptions;
    use crate::remote::scripted::ScriptedInvoker;
    use crate::remote::{MockRemoteInvoker, OperationKind, RemoteRequest, RemoteResponse};
    use mockall::Sequence;

    const INSTANCE: &str = "arn:aws:connect:us-west-2:111111111111:instance/instance-1";
    const GROUP: &str = "arn:aws:connect:us-west-2:111111111111:instance/instance-1/agent-group/group-1";
    const PARENT_1: &str = "arn:aws:connect:us-west-2:111111111111:instance/instance-1/agent-group/parent-1";
    const PARENT_2: &str = "arn:aws:connect:us-west-2:111111111111:instance/instance-1/agent-group/parent-2";

    fn rename_and_move_plan() -> ReconcilePlan {
        let previous = ResourceSnapshot::new(INSTANCE, "team")
            .with_group_arn(GROUP)
            .with_parent(PARENT_1);
        let desired = ResourceSnapshot::new(INSTANCE, "renamed")
            .with_group_arn(GROUP)
            .with_parent(PARENT_2);
        let changes = ChangeDetector::new().detect(&previous, &desired);
        ReconcilePlan::build(&previous, &desired, &changes, &PlanOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_calls_in_order_with_mock() {
        let mut invoker = MockRemoteInvoker::new();
        let mut seq = Sequence::new();

        invoker
            .expect_invoke()
            .withf(|req| matches!(req, RemoteRequest::RenameGroup(r) if r.name == "renamed"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(RemoteResponse::Acknowledged));
        invoker
            .expect_invoke()
            .withf(|req| matches!(req, RemoteRequest::CreateGroup(r) if r.name == "renamed"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(RemoteResponse::Created {
                    group_id: Some(String::from("group-2")),
                    group_arn: Some(String::from("arn:group-2")),
                })
            });
        invoker
            .expect_invoke()
            .withf(|req| matches!(req, RemoteRequest::DeleteGroup(r) if r.hierarchy_group_id == GROUP))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(RemoteResponse::Acknowledged));

        let plan = rename_and_move_plan();
        let mut progress = ReconcileProgress::fresh("fp");
        let report = Sequencer::new(&invoker).execute(&plan, &mut progress).await.unwrap();

        assert!(report.finished);
        assert_eq!(report.invoked.len(), 3);
        assert_eq!(report.replacement_arn.as_deref(), Some("arn:group-2"));
        assert_eq!(progress.replacement_arn.as_deref(), Some("arn:group-2"));
    }

    #[tokio::test]
    async fn test_stops_on_first_failure() {
        let invoker = ScriptedInvoker::new();
        invoker.fail_on(OperationKind::CreateGroup, ErrorKind::Throttling);

        let plan = rename_and_move_plan();
        let mut progress = ReconcileProgress::fresh("fp");
        let err = Sequencer::new(&invoker).execute(&plan, &mut progress).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Throttling);
        assert!(matches!(
            &err,
            HandlerError::StepFailed { step, source: RemoteError::Throttled { .. }, .. } if step == "recreate.create"
        ));
        assert_eq!(invoker.kinds(), vec![OperationKind::RenameGroup, OperationKind::CreateGroup]);
        assert_eq!(invoker.count(OperationKind::DeleteGroup), 0);
        assert!(progress.is_completed("rename"));
        assert!(!progress.is_completed("recreate.create"));
    }

    #[tokio::test]
    async fn test_retry_after_failed_delete_does_not_recreate() {
        let invoker = ScriptedInvoker::new();
        invoker.fail_on(OperationKind::DeleteGroup, ErrorKind::ServiceFailure);

        let plan = rename_and_move_plan();
        let mut progress = ReconcileProgress::fresh("fp");
        assert!(Sequencer::new(&invoker).execute(&plan, &mut progress).await.is_err());
        assert_eq!(progress.replacement_arn.as_deref(), Some(format!("{INSTANCE}/agent-group/replacement-1").as_str()));

        invoker.clear_failures();
        let report = Sequencer::new(&invoker).execute(&plan, &mut progress).await.unwrap();

        assert!(report.finished);
        assert_eq!(report.skipped, vec![StepKey::Rename, StepKey::RecreateCreate]);
        assert_eq!(report.invoked, vec![StepKey::RecreateDelete]);
        assert_eq!(invoker.count(OperationKind::CreateGroup), 1);
        assert_eq!(invoker.count(OperationKind::DeleteGroup), 2);
        assert_eq!(
            report.replacement_arn.as_deref(),
            Some(format!("{INSTANCE}/agent-group/replacement-1").as_str())
        );
    }

    #[tokio::test]
    async fn test_step_budget_yields_in_progress() {
        let invoker = ScriptedInvoker::new();
        let plan = rename_and_move_plan();
        let mut progress = ReconcileProgress::fresh("fp");
        let sequencer = Sequencer::new(&invoker).with_step_budget(Some(2));

        let first = sequencer.execute(&plan, &mut progress).await.unwrap();
        assert!(!first.finished);
        assert_eq!(first.invoked, vec![StepKey::Rename, StepKey::RecreateCreate]);

        let second = sequencer.execute(&plan, &mut progress).await.unwrap();
        assert!(second.finished);
        assert_eq!(second.invoked, vec![StepKey::RecreateDelete]);
        assert_eq!(invoker.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_budget_equal_to_steps_finishes() {
        let invoker = ScriptedInvoker::new();
        let plan = rename_and_move_plan();
        let mut progress = ReconcileProgress::fresh("fp");
        let report = Sequencer::new(&invoker)
            .with_step_budget(Some(3))
            .execute(&plan, &mut progress)
            .await
            .unwrap();
        assert!(report.finished);
    }

    #[tokio::test]
    async fn test_empty_plan_makes_no_calls() {
        let invoker = MockRemoteInvoker::new();
        let previous = ResourceSnapshot::new(INSTANCE, "team").with_group_arn(GROUP);
        let changes = ChangeDetector::new().detect(&previous, &previous);
        let plan = ReconcilePlan::build(&previous, &previous, &changes, &PlanOptions::default()).unwrap();

        let mut progress = ReconcileProgress::fresh("fp");
        let report = Sequencer::new(&invoker)
            .with_step_budget(Some(0))
            .execute(&plan, &mut progress)
            .await
            .unwrap();
        assert!(report.finished);
        assert!(report.invoked.is_empty());
    }
}
