//! Resource snapshot types for user hierarchy groups.
//!
//! A snapshot is a point-in-time description of a group's fields. Two of them,
//! `previous` and `desired`, are compared to decide which remote calls an
//! update needs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time description of a user hierarchy group.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceSnapshot {
    /// Identity of the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_hierarchy_group_arn: Option<String>,
    /// Owning instance. Immutable once the group exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_arn: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Parent group identity; absent for a top-level group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_arn: Option<String>,
    /// Resource tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// An opaque key-value tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

/// Tags keyed by tag key. A later duplicate key replaces the earlier entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    entries: BTreeMap<String, String>,
}

/// Null-safe string equality: absent and empty are the same value.
#[must_use]
pub fn fields_equal(a: Option<&str>, b: Option<&str>) -> bool {
    a.unwrap_or_default() == b.unwrap_or_default()
}

/// Treats an empty string as absent.
#[must_use]
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl ResourceSnapshot {
    /// Creates a snapshot for a group within an instance.
    #[must_use]
    pub fn new(instance_arn: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            instance_arn: Some(instance_arn.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the group identity.
    #[must_use]
    pub fn with_group_arn(mut self, arn: impl Into<String>) -> Self {
        self.user_hierarchy_group_arn = Some(arn.into());
        self
    }

    /// Sets the parent group identity.
    #[must_use]
    pub fn with_parent(mut self, arn: impl Into<String>) -> Self {
        self.parent_group_arn = Some(arn.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }

    /// Group identity, if present and non-empty.
    #[must_use]
    pub fn group_arn(&self) -> Option<&str> {
        non_empty(self.user_hierarchy_group_arn.as_deref())
    }

    /// Owning instance, if present and non-empty.
    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        non_empty(self.instance_arn.as_deref())
    }

    /// Display name, if present and non-empty.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        non_empty(self.name.as_deref())
    }

    /// Parent identity, if present and non-empty.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        non_empty(self.parent_group_arn.as_deref())
    }

    /// Returns the tags as a key-unique set.
    #[must_use]
    pub fn tag_set(&self) -> TagSet {
        self.tags.iter().cloned().collect()
    }

    /// Identity used in log lines and error messages.
    #[must_use]
    pub fn label(&self) -> String {
        self.group_arn()
            .or_else(|| self.display_name())
            .unwrap_or("<unidentified group>")
            .to_string()
    }
}

impl Tag {
    /// Creates a new tag.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl TagSet {
    /// Creates an empty tag set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Inserts a tag, replacing any existing value for its key.
    pub fn insert(&mut self, tag: Tag) {
        self.entries.insert(tag.key, tag.value);
    }

    /// Returns true if the exact key-value pair is present.
    #[must_use]
    pub fn contains(&self, key: &str, value: &str) -> bool {
        self.entries.get(key).is_some_and(|v| v == value)
    }

    /// Pairs present here but not in `other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter(|(k, v)| !other.contains(k, v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over key-value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the tags as a plain map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries.clone()
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<T: IntoIterator<Item = Tag>>(iter: T) -> Self {
        let mut set = Self::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}
