//! Tag set difference.
//!
//! Tags are compared as key-value pairs, so a changed value for an existing
//! key shows up once in each direction.

use std::collections::BTreeMap;

use crate::model::TagSet;

/// Tags to add and remove to go from one tag set to another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    /// Pairs in desired but not in previous.
    pub to_add: BTreeMap<String, String>,
    /// Pairs in previous but not in desired.
    pub to_remove: BTreeMap<String, String>,
}

impl TagDiff {
    /// Computes the difference between previous and desired tags.
    #[must_use]
    pub fn between(previous: &TagSet, desired: &TagSet) -> Self {
        Self {
            to_add: desired.difference(previous),
            to_remove: previous.difference(desired),
        }
    }

    /// Keys to pass to an untag call.
    #[must_use]
    pub fn untag_keys(&self) -> Vec<String> {
        self.to_remove.keys().cloned().collect()
    }

    /// Returns true if the tag sets are identical.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tag;

    fn tags(pairs: &[(&str, &str)]) -> TagSet {
        pairs.iter().map(|(k, v)| Tag::new(*k, *v)).collect()
    }

    #[test]
    fn test_add_and_remove() {
        let diff = TagDiff::between(&tags(&[("A", "1"), ("B", "2")]), &tags(&[("B", "2"), ("C", "3")]));

        assert_eq!(diff.to_add, BTreeMap::from([(String::from("C"), String::from("3"))]));
        assert_eq!(diff.to_remove, BTreeMap::from([(String::from("A"), String::from("1"))]));
        assert!(!diff.to_add.contains_key("B"));
        assert!(!diff.to_remove.contains_key("B"));
        assert_eq!(diff.untag_keys(), vec![String::from("A")]);
    }

    #[test]
    fn test_changed_value_is_remove_and_add() {
        let diff = TagDiff::between(&tags(&[("env", "dev")]), &tags(&[("env", "prod")]));
        assert_eq!(diff.to_remove.get("env").map(String::as_str), Some("dev"));
        assert_eq!(diff.to_add.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn test_identical_sets() {
        let same = tags(&[("A", "1")]);
        assert!(TagDiff::between(&same, &same).is_empty());
        assert!(TagDiff::between(&TagSet::new(), &TagSet::new()).is_empty());
    }
}
