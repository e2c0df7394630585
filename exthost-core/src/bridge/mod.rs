//! Host bridge implementations
//!
//! - [`FsHostBridge`]: manifests, settings and preferences as JSON files
//! - [`MemoryHostBridge`]: everything in memory, for embedding and tests
//!
//! Both answer [`invoke`](exthost_api::HostBridge::invoke) from a
//! [`MethodTable`] of named handlers.

mod fs;
mod memory;

pub use fs::FsHostBridge;
pub use memory::MemoryHostBridge;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use exthost_api::BridgeError;
use serde_json::Value;

/// A host method callable by plugins
pub type MethodHandler = Arc<dyn Fn(Vec<Value>) -> Result<Value, BridgeError> + Send + Sync>;

/// Named host methods
#[derive(Default)]
pub struct MethodTable {
    handlers: RwLock<HashMap<String, MethodHandler>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous handler
    pub fn register<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Vec<Value>) -> Result<Value, BridgeError> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Arc::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| BridgeError::UnknownMethod(name.to_string()))?;
        handler(args)
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("MethodTable")
            .field("methods", &handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
