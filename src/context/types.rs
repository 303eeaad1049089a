//! The callback context bag.
//!
//! A caller-owned map of named slots threaded through an update so that a
//! retried or continued reconciliation can resume. The reconciler reads and
//! writes slots; persisting and replaying the bag is up to the caller.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ContextError;

/// Opaque resumption state for one resource update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackContext {
    #[serde(default, flatten)]
    slots: BTreeMap<String, serde_json::Value>,
}

impl CallbackContext {
    /// Creates an empty context.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }

    /// Reads a slot.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot holds a value of a different shape.
    pub fn get<T: DeserializeOwned>(&self, slot: &str) -> Result<Option<T>, ContextError> {
        self.slots
            .get(slot)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| ContextError::Corrupted {
                    message: format!("Slot '{slot}' has an unexpected shape: {e}"),
                })
            })
            .transpose()
    }

    /// Writes a slot, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded.
    pub fn set<T: Serialize>(&mut self, slot: impl Into<String>, value: &T) -> Result<(), ContextError> {
        let slot = slot.into();
        let value = serde_json::to_value(value)
            .map_err(|e| ContextError::serialization(format!("Slot '{slot}': {e}")))?;
        self.slots.insert(slot, value);
        Ok(())
    }

    /// Removes a slot, returning its raw value.
    pub fn remove(&mut self, slot: &str) -> Option<serde_json::Value> {
        self.slots.remove(slot)
    }

    /// Returns true if the slot is present.
    #[must_use]
    pub fn contains(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    /// Returns true if no slot is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Names of all set slots, in order.
    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut context = CallbackContext::new();
        assert!(context.is_empty());

        context.set("attempts", &3_u32).unwrap();
        context.set("steps", &vec!["rename"]).unwrap();

        assert_eq!(context.get::<u32>("attempts").unwrap(), Some(3));
        assert_eq!(
            context.get::<Vec<String>>("steps").unwrap(),
            Some(vec![String::from("rename")])
        );
        assert_eq!(context.get::<u32>("missing").unwrap(), None);
        assert_eq!(context.slot_names().collect::<Vec<_>>(), vec!["attempts", "steps"]);
    }

    #[test]
    fn test_wrong_shape_is_corrupted() {
        let mut context = CallbackContext::new();
        context.set("attempts", &"three").unwrap();
        assert!(matches!(
            context.get::<u32>("attempts"),
            Err(ContextError::Corrupted { .. })
        ));
    }

    #[test]
    fn test_serializes_flat() {
        let mut context = CallbackContext::new();
        context.set("engine_slot", &"kept").unwrap();
        let json = serde_json::to_string(&context).unwrap();
        assert_eq!(json, r#"{"engine_slot":"kept"}"#);

        let back: CallbackContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, context);
        assert!(back.contains("engine_slot"));
    }
}
