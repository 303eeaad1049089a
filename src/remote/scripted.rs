//! Scripted invoker for unit tests: records calls and fails chosen operations.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{ErrorKind, RemoteError};

use super::invoker::RemoteInvoker;
use super::types::{OperationKind, RemoteRequest, RemoteResponse};

/// Test invoker with per-operation failure injection.
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    calls: Mutex<Vec<RemoteRequest>>,
    failures: Mutex<HashMap<OperationKind, ErrorKind>>,
    created: Mutex<usize>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call of `operation` fail with `kind` until cleared.
    pub fn fail_on(&self, operation: OperationKind, kind: ErrorKind) {
        self.failures.lock().unwrap().insert(operation, kind);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<RemoteRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<OperationKind> {
        self.calls().iter().map(RemoteRequest::kind).collect()
    }

    pub fn count(&self, operation: OperationKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == operation).count()
    }
}

#[async_trait]
impl RemoteInvoker for ScriptedInvoker {
    async fn invoke(&self, request: RemoteRequest) -> Result<RemoteResponse, RemoteError> {
        let kind = request.kind();
        let target = request.target().to_string();
        self.calls.lock().unwrap().push(request.clone());

        if let Some(error_kind) = self.failures.lock().unwrap().get(&kind).copied() {
            return Err(RemoteError::of_kind(error_kind, kind, target, "scripted failure"));
        }

        match request {
            RemoteRequest::CreateGroup(req) => {
                let mut created = self.created.lock().unwrap();
                *created += 1;
                let group_id = format!("replacement-{created}");
                Ok(RemoteResponse::Created {
                    group_arn: Some(format!("{}/agent-group/{group_id}", req.instance_id)),
                    group_id: Some(group_id),
                })
            }
            _ => Ok(RemoteResponse::Acknowledged),
        }
    }

    fn invoker_name(&self) -> &'static str {
        "scripted"
    }
}
