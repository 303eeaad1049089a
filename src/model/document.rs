//! Update request documents.
//!
//! A request document carries the desired and previous snapshots of one
//! group, in the shape the workflow engine hands to resource handlers. YAML
//! and JSON are both accepted since JSON is valid YAML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ReconcilerError, RequestError, Result};

use super::snapshot::ResourceSnapshot;

/// An update request for a single group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestDocument {
    /// Target state.
    pub desired_resource_state: ResourceSnapshot,
    /// Last applied state.
    pub previous_resource_state: ResourceSnapshot,
    /// Optional idempotency token supplied by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_request_token: Option<String>,
}

impl RequestDocument {
    /// Creates a request from two snapshots.
    #[must_use]
    pub const fn new(desired: ResourceSnapshot, previous: ResourceSnapshot) -> Self {
        Self {
            desired_resource_state: desired,
            previous_resource_state: previous,
            client_request_token: None,
        }
    }

    /// Loads a request document from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading request from: {}", path.display());

        if !path.exists() {
            return Err(ReconcilerError::Request(RequestError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ReconcilerError::Request(RequestError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        Self::parse(&content, Some(path))
    }

    /// Parses a request document from YAML or JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is invalid.
    pub fn parse(content: &str, source: Option<&Path>) -> Result<Self> {
        debug!("Parsing request document");

        let document: Self = serde_yaml::from_str(content).map_err(|e| {
            ReconcilerError::Request(RequestError::ParseError {
                message: format!("Request parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })?;

        debug!(
            "Parsed request for group: {}",
            document.desired_resource_state.label()
        );
        Ok(document)
    }

    /// Key under which callback context for this resource is stored.
    ///
    /// Derived from the previous group identity since that is the identity the
    /// update starts from; falls back to the desired one.
    #[must_use]
    pub fn resource_key(&self) -> String {
        let identity = self
            .previous_resource_state
            .group_arn()
            .or_else(|| self.desired_resource_state.group_arn())
            .unwrap_or("unidentified");

        identity
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_request() {
        let yaml = r"
desiredResourceState:
  UserHierarchyGroupArn: arn:aws:connect:us-west-2:111111111111:instance/i/agent-group/g
  InstanceArn: arn:aws:connect:us-west-2:111111111111:instance/i
  Name: renamed
previousResourceState:
  UserHierarchyGroupArn: arn:aws:connect:us-west-2:111111111111:instance/i/agent-group/g
  InstanceArn: arn:aws:connect:us-west-2:111111111111:instance/i
  Name: original
  Tags:
    - Key: team
      Value: blue
";
        let document = RequestDocument::parse(yaml, None).unwrap();
        assert_eq!(document.desired_resource_state.display_name(), Some("renamed"));
        assert_eq!(document.previous_resource_state.tags.len(), 1);
        assert!(document.client_request_token.is_none());
    }

    #[test]
    fn test_parse_json_request() {
        let json = r#"{
            "desiredResourceState": {"InstanceArn": "arn:i", "Name": "a"},
            "previousResourceState": {"InstanceArn": "arn:i", "Name": "a"},
            "clientRequestToken": "token-1"
        }"#;
        let document = RequestDocument::parse(json, None).unwrap();
        assert_eq!(document.client_request_token.as_deref(), Some("token-1"));
    }

    #[test]
    fn test_parse_rejects_missing_previous() {
        let yaml = "desiredResourceState:\n  Name: a\n";
        assert!(RequestDocument::parse(yaml, None).is_err());
    }

    #[test]
    fn test_resource_key_is_filesystem_safe() {
        let previous = ResourceSnapshot::new("arn:i", "a")
            .with_group_arn("arn:aws:connect:us-west-2:1:instance/i/agent-group/g");
        let document = RequestDocument::new(previous.clone(), previous);
        let key = document.resource_key();
        assert!(!key.contains('/'));
        assert!(!key.contains(':'));
        assert!(key.ends_with("agent-group_g"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = RequestDocument::load_file("/nonexistent/request.yaml");
        assert!(matches!(
            result,
            Err(ReconcilerError::Request(RequestError::FileNotFound { .. }))
        ));
    }
}
