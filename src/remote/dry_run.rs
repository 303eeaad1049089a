//! Dry-run invoker.
//!
//! Records and logs every request instead of calling the service. Creates are
//! answered with a synthetic group identity under the owning instance so the
//! rest of a sequence can proceed.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::RemoteError;

use super::invoker::RemoteInvoker;
use super::types::{RemoteRequest, RemoteResponse};

/// Invoker that records calls without performing them.
#[derive(Debug, Default)]
pub struct DryRunInvoker {
    /// Requests received, in order.
    recorded: Mutex<Vec<RemoteRequest>>,
}

impl DryRunInvoker {
    /// Creates a new dry-run invoker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the requests received so far.
    pub async fn recorded(&self) -> Vec<RemoteRequest> {
        self.recorded.lock().await.clone()
    }

    /// Returns the number of requests received so far.
    pub async fn call_count(&self) -> usize {
        self.recorded.lock().await.len()
    }
}

#[async_trait]
impl RemoteInvoker for DryRunInvoker {
    async fn invoke(&self, request: RemoteRequest) -> Result<RemoteResponse, RemoteError> {
        info!("[dry-run] {request}");

        let response = match &request {
            RemoteRequest::CreateGroup(req) => {
                let group_id = Uuid::new_v4().to_string();
                RemoteResponse::Created {
                    group_arn: Some(format!("{}/agent-group/{group_id}", req.instance_id)),
                    group_id: Some(group_id),
                }
            }
            _ => RemoteResponse::Acknowledged,
        };

        self.recorded.lock().await.push(request);
        Ok(response)
    }

    fn invoker_name(&self) -> &'static str {
        "dry-run"
    }
}
