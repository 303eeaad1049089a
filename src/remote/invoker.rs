//! Remote invoker trait definition.
//!
//! This module defines the seam between the reconciler and whatever performs
//! remote calls. An invoker executes exactly one call per `invoke` and never
//! retries; retry is the workflow engine's decision.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::RemoteError;

use super::types::{RemoteRequest, RemoteResponse};

/// Trait for remote call backends.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteInvoker: Send + Sync {
    /// Performs one remote call.
    async fn invoke(&self, request: RemoteRequest) -> Result<RemoteResponse, RemoteError>;

    /// Gets the invoker name for logs.
    fn invoker_name(&self) -> &'static str;
}

#[async_trait]
impl RemoteInvoker for Box<dyn RemoteInvoker> {
    async fn invoke(&self, request: RemoteRequest) -> Result<RemoteResponse, RemoteError> {
        (**self).invoke(request).await
    }

    fn invoker_name(&self) -> &'static str {
        (**self).invoker_name()
    }
}
