//! Remote invocation module.
//!
//! This module provides the invoker seam used by the operation sequencer,
//! the wire request types, and two invokers: one backed by Amazon Connect
//! and one that only records what it would have done.

mod types;
mod invoker;
mod connect;
mod dry_run;
#[cfg(test)]
pub(crate) mod scripted;

pub use types::{
    CreateGroupRequest, DeleteGroupRequest, OperationKind, RemoteRequest, RemoteResponse,
    TagResourceRequest, UntagResourceRequest, UpdateGroupNameRequest,
};
pub use invoker::RemoteInvoker;
#[cfg(test)]
pub(crate) use invoker::MockRemoteInvoker;
pub use connect::ConnectInvoker;
pub use dry_run::DryRunInvoker;
