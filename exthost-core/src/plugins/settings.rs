//! SettingsStore - reactive per-plugin key/value settings
//!
//! The `disabled` key is always present. Flipping it is the only way a
//! plugin gets enabled or disabled: the owning instance observes the store
//! and turns the flip into a load or unload.

use std::sync::{PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::events::EventEmitter;

/// Key every settings store carries
pub const DISABLED_KEY: &str = "disabled";

/// A mutation of a settings store
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsChange {
    /// Snapshot after the mutation
    pub new: Map<String, Value>,
    /// Snapshot before the mutation
    pub old: Map<String, Value>,
}

impl SettingsChange {
    pub fn was_disabled(&self) -> bool {
        is_disabled(&self.old)
    }

    pub fn is_disabled(&self) -> bool {
        is_disabled(&self.new)
    }
}

fn is_disabled(values: &Map<String, Value>) -> bool {
    values
        .get(DISABLED_KEY)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Merge `patch` into `target`, recursing into nested objects
fn deep_merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => deep_merge(existing, nested),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

/// Reactive key/value store owned by exactly one plugin instance
#[derive(Debug)]
pub struct SettingsStore {
    values: RwLock<Map<String, Value>>,
    changes: EventEmitter<SettingsChange>,
}

impl SettingsStore {
    /// Create a store seeded with persisted values on top of the defaults
    pub fn new(persisted: Option<Map<String, Value>>, capacity: usize) -> Self {
        let mut values = Map::new();
        values.insert(DISABLED_KEY.to_string(), Value::Bool(false));
        values.extend(persisted.unwrap_or_default());

        Self {
            values: RwLock::new(values),
            changes: EventEmitter::new(capacity),
        }
    }

    /// Current value for `key`
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Current value for `key`, deserialized
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn disabled(&self) -> bool {
        is_disabled(&self.values.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Set a single key. Returns `false` (and emits nothing) if the value is unchanged.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let change = {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            if values.get(key) == Some(&value) {
                return false;
            }
            let old = values.clone();
            values.insert(key.to_string(), value);
            SettingsChange {
                new: values.clone(),
                old,
            }
        };

        self.changes.emit(change);
        true
    }

    /// Deep-merge an object patch. Returns `false` if nothing changed.
    pub fn merge(&self, patch: Map<String, Value>) -> bool {
        let change = {
            let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
            let old = values.clone();
            deep_merge(&mut values, patch);
            if *values == old {
                return false;
            }
            SettingsChange {
                new: values.clone(),
                old,
            }
        };

        self.changes.emit(change);
        true
    }

    /// Full copy of the current values
    pub fn snapshot(&self) -> Map<String, Value> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Observe every effective mutation
    pub fn subscribe(&self) -> broadcast::Receiver<SettingsChange> {
        self.changes.subscribe()
    }
}
