//! Amazon Connect invoker.
//!
//! This module performs hierarchy group calls through the Connect SDK and
//! maps SDK failures onto [`RemoteError`].

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_connect::Client;
use aws_sdk_connect::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::error::{ErrorKind, RemoteError};

use super::invoker::RemoteInvoker;
use super::types::{
    CreateGroupRequest, DeleteGroupRequest, OperationKind, RemoteRequest, RemoteResponse,
    TagResourceRequest, UntagResourceRequest, UpdateGroupNameRequest,
};

/// Invoker backed by the Amazon Connect API.
#[derive(Debug, Clone)]
pub struct ConnectInvoker {
    /// Connect SDK client.
    client: Client,
}

impl ConnectInvoker {
    /// Creates an invoker using the default credential and region chain.
    pub async fn from_env(region: Option<&str>, endpoint_url: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        if let Some(url) = endpoint_url {
            debug!("Using Connect endpoint override: {url}");
            loader = loader.endpoint_url(url);
        }

        let config = loader.load().await;

        Self {
            client: Client::new(&config),
        }
    }

    /// Creates an invoker with an existing client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn rename_group(&self, req: UpdateGroupNameRequest) -> Result<RemoteResponse, RemoteError> {
        self.client
            .update_user_hierarchy_group_name()
            .instance_id(&req.instance_id)
            .hierarchy_group_id(&req.hierarchy_group_id)
            .name(&req.name)
            .send()
            .await
            .map_err(|e| classify_sdk_error(OperationKind::RenameGroup, &req.hierarchy_group_id, e))?;

        Ok(RemoteResponse::Acknowledged)
    }

    async fn create_group(&self, req: CreateGroupRequest) -> Result<RemoteResponse, RemoteError> {
        let tags: Option<HashMap<String, String>> = if req.tags.is_empty() {
            None
        } else {
            Some(req.tags.into_iter().collect())
        };

        let output = self
            .client
            .create_user_hierarchy_group()
            .instance_id(&req.instance_id)
            .name(&req.name)
            .set_parent_group_id(req.parent_group_id)
            .set_tags(tags)
            .send()
            .await
            .map_err(|e| classify_sdk_error(OperationKind::CreateGroup, &req.instance_id, e))?;

        Ok(RemoteResponse::Created {
            group_id: output.hierarchy_group_id().map(str::to_string),
            group_arn: output.hierarchy_group_arn().map(str::to_string),
        })
    }

    async fn delete_group(&self, req: DeleteGroupRequest) -> Result<RemoteResponse, RemoteError> {
        self.client
            .delete_user_hierarchy_group()
            .instance_id(&req.instance_id)
            .hierarchy_group_id(&req.hierarchy_group_id)
            .send()
            .await
            .map_err(|e| classify_sdk_error(OperationKind::DeleteGroup, &req.hierarchy_group_id, e))?;

        Ok(RemoteResponse::Acknowledged)
    }

    async fn tag_resource(&self, req: TagResourceRequest) -> Result<RemoteResponse, RemoteError> {
        let tags: HashMap<String, String> = req.tags.into_iter().collect();

        self.client
            .tag_resource()
            .resource_arn(&req.resource_arn)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| classify_sdk_error(OperationKind::TagResource, &req.resource_arn, e))?;

        Ok(RemoteResponse::Acknowledged)
    }

    async fn untag_resource(&self, req: UntagResourceRequest) -> Result<RemoteResponse, RemoteError> {
        self.client
            .untag_resource()
            .resource_arn(&req.resource_arn)
            .set_tag_keys(Some(req.tag_keys))
            .send()
            .await
            .map_err(|e| classify_sdk_error(OperationKind::UntagResource, &req.resource_arn, e))?;

        Ok(RemoteResponse::Acknowledged)
    }
}

#[async_trait]
impl RemoteInvoker for ConnectInvoker {
    async fn invoke(&self, request: RemoteRequest) -> Result<RemoteResponse, RemoteError> {
        trace!("Invoking {request}");

        match request {
            RemoteRequest::RenameGroup(req) => self.rename_group(req).await,
            RemoteRequest::CreateGroup(req) => self.create_group(req).await,
            RemoteRequest::DeleteGroup(req) => self.delete_group(req).await,
            RemoteRequest::TagResource(req) => self.tag_resource(req).await,
            RemoteRequest::UntagResource(req) => self.untag_resource(req).await,
        }
    }

    fn invoker_name(&self) -> &'static str {
        "connect"
    }
}

/// Maps an SDK error onto the reconciler's error taxonomy.
fn classify_sdk_error<E, R>(operation: OperationKind, resource: &str, err: SdkError<E, R>) -> RemoteError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let transport = matches!(err, SdkError::TimeoutError(_) | SdkError::DispatchFailure(_));
    let code = err.code().map(str::to_string);
    let detail = err.message().map(str::to_string);
    let message = match detail {
        Some(message) => message,
        None => DisplayErrorContext(err).to_string(),
    };

    let kind = classify_code(code.as_deref(), transport);
    debug!(
        "{operation} failed with code {} ({kind})",
        code.as_deref().unwrap_or("none")
    );

    RemoteError::of_kind(kind, operation, resource, message)
}

/// Classifies a service error code.
fn classify_code(code: Option<&str>, transport: bool) -> ErrorKind {
    if transport {
        return ErrorKind::ServiceFailure;
    }

    match code {
        Some("ResourceNotFoundException") => ErrorKind::NotFound,
        Some("ThrottlingException" | "TooManyRequestsException" | "LimitExceededException") => {
            ErrorKind::Throttling
        }
        Some(
            "InvalidRequestException"
            | "InvalidParameterException"
            | "DuplicateResourceException"
            | "ResourceInUseException",
        ) => ErrorKind::InvalidRequest,
        Some("InternalServiceException") => ErrorKind::ServiceFailure,
        _ => ErrorKind::GeneralFailure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_not_found() {
        assert_eq!(
            classify_code(Some("ResourceNotFoundException"), false),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_classify_throttling() {
        assert_eq!(classify_code(Some("ThrottlingException"), false), ErrorKind::Throttling);
        assert_eq!(classify_code(Some("LimitExceededException"), false), ErrorKind::Throttling);
    }

    #[test]
    fn test_classify_invalid_request() {
        assert_eq!(
            classify_code(Some("DuplicateResourceException"), false),
            ErrorKind::InvalidRequest
        );
        assert_eq!(
            classify_code(Some("ResourceInUseException"), false),
            ErrorKind::InvalidRequest
        );
    }

    #[test]
    fn test_classify_transport_wins() {
        assert_eq!(classify_code(None, true), ErrorKind::ServiceFailure);
        assert_eq!(
            classify_code(Some("ResourceNotFoundException"), true),
            ErrorKind::ServiceFailure
        );
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify_code(None, false), ErrorKind::GeneralFailure);
        assert_eq!(classify_code(Some("AccessDeniedException"), false), ErrorKind::GeneralFailure);
        assert_eq!(
            classify_code(Some("InternalServiceException"), false),
            ErrorKind::ServiceFailure
        );
    }
}
