//! Hook fan-out from host to plugin sandboxes

use std::sync::Arc;

use exthost_api::{HOOK_APP, HOOK_EDITOR, HostMessage};
use heck::ToSnakeCase;
use serde_json::Value;

use super::instance::PluginInstance;

/// Hook namespaces the host emits into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookNamespace {
    App,
    Editor,
}

impl HookNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::App => HOOK_APP,
            Self::Editor => HOOK_EDITOR,
        }
    }
}

/// Posts hook messages to every connected sandbox
#[derive(Debug, Default, Clone, Copy)]
pub struct HookDispatcher;

impl HookDispatcher {
    /// Deliver `kind` to each instance with a live channel.
    ///
    /// Unconnected instances (disabled, failed, theme-only) are skipped.
    /// Returns how many sandboxes the message reached.
    pub fn dispatch<'a, I>(&self, targets: I, ns: HookNamespace, kind: &str, payload: &Value) -> usize
    where
        I: IntoIterator<Item = &'a Arc<PluginInstance>>,
    {
        let kind = kind.to_snake_case();
        let mut reached = 0;

        for instance in targets {
            let Some(channel) = instance.channel() else {
                continue;
            };
            match channel.post(HostMessage::hook(ns.as_str(), kind.as_str(), payload.clone())) {
                Ok(()) => reached += 1,
                Err(e) => {
                    tracing::warn!(plugin = %instance.id(), hook = %kind, error = %e, "Failed to post hook")
                }
            }
        }

        tracing::trace!(ns = ns.as_str(), hook = %kind, reached, "Hook dispatched");
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_map_to_wire_names() {
        assert_eq!(HookNamespace::App.as_str(), "hook:app");
        assert_eq!(HookNamespace::Editor.as_str(), "hook:editor");
    }

    #[test]
    fn test_dispatch_to_nobody_reaches_nobody() {
        let none: Vec<Arc<PluginInstance>> = Vec::new();
        assert_eq!(
            HookDispatcher.dispatch(&none, HookNamespace::App, "routeChanged", &Value::Null),
            0
        );
    }
}
