// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Hierarchy Group Reconciler
//!
//! Update handler for Amazon Connect user hierarchy groups.
//!
//! ## Overview
//!
//! Given the previous and desired snapshot of one group, the handler issues
//! the minimal remote calls that make the live group match:
//!
//! - A changed name is applied in place with a rename
//! - A changed parent is applied by creating a replacement group under the
//!   new parent and deleting the previous one
//! - Tag differences are applied when tag reconciliation is enabled
//! - A changed owning instance is rejected before any remote call
//!
//! ## Architecture
//!
//! Each invocation is a pure function of its inputs and the callback context:
//!
//! 1. **Guard**: Rejects changes to immutable fields
//! 2. **Change Detector**: Null-safe comparison of name and parent
//! 3. **Planner**: Orders the remote steps
//! 4. **Sequencer**: Runs the steps, recording progress in the context
//!
//! ## Modules
//!
//! - [`model`]: Resource snapshots and request documents
//! - [`planner`]: Guard, change detection, planning and sequencing
//! - [`remote`]: Remote invoker trait and backends
//! - [`context`]: Callback context and its storage backends (local, S3)
//! - [`handler`]: The update handler entry point
//! - [`config`]: Settings parsing and validation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! desiredResourceState:
//!   InstanceArn: arn:aws:connect:us-west-2:111111111111:instance/instance-1
//!   UserHierarchyGroupArn: arn:aws:connect:us-west-2:111111111111:instance/instance-1/agent-group/group-1
//!   Name: support-tier-2
//!   ParentGroupArn: arn:aws:connect:us-west-2:111111111111:instance/instance-1/agent-group/support
//! previousResourceState:
//!   InstanceArn: arn:aws:connect:us-west-2:111111111111:instance/instance-1
//!   UserHierarchyGroupArn: arn:aws:connect:us-west-2:111111111111:instance/instance-1/agent-group/group-1
//!   Name: support-tier-1
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod model;
pub mod planner;
pub mod remote;

// ============================================================================
// Re-exports
// ============================================================================

pub use context::{CallbackContext, ContextStore, LocalContextStore, S3ContextStore};
pub use error::{ErrorKind, ReconcilerError, Result};
pub use handler::{HandlerOptions, ProgressOutcome, UpdateHandler};
pub use model::{RequestDocument, ResourceSnapshot};
pub use planner::{ChangeDetector, ImmutableFieldGuard, ReconcilePlan, Sequencer};
pub use remote::{ConnectInvoker, DryRunInvoker, RemoteInvoker};
