//! Planning module for group updates.
//!
//! This module guards immutable fields, detects structural changes between
//! the previous and desired snapshots, turns them into an ordered plan of
//! remote steps, and runs that plan.

mod guard;
mod diff;
mod tags;
mod plan;
mod executor;

pub use guard::ImmutableFieldGuard;
pub use diff::{ChangeDetector, ChangeKind, ChangeSet, FieldChange};
pub use tags::TagDiff;
pub use plan::{Operation, PlanOptions, PlannedStep, ReconcilePlan, StepKey, TagReconciliation};
pub use executor::{ExecutionReport, Sequencer};
