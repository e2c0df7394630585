//! Registration batch types

use std::collections::HashSet;

use exthost_api::PluginId;

use super::barrier::ReadyBarrier;
use super::options::PluginOptions;
use crate::error::PluginError;

/// A single item or a list, normalized to a list
#[derive(Debug, Clone, PartialEq)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        Self::Many(items)
    }
}

impl From<PluginOptions> for OneOrMany<PluginOptions> {
    fn from(options: PluginOptions) -> Self {
        Self::One(options)
    }
}

impl From<&str> for OneOrMany<PluginId> {
    fn from(id: &str) -> Self {
        Self::One(id.to_string())
    }
}

impl From<String> for OneOrMany<PluginId> {
    fn from(id: String) -> Self {
        Self::One(id)
    }
}

impl From<&String> for OneOrMany<PluginId> {
    fn from(id: &String) -> Self {
        Self::One(id.clone())
    }
}

impl From<Vec<&str>> for OneOrMany<PluginId> {
    fn from(ids: Vec<&str>) -> Self {
        Self::Many(ids.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for OneOrMany<PluginId> {
    fn from(ids: &[&str]) -> Self {
        Self::Many(ids.iter().map(|id| id.to_string()).collect())
    }
}

/// What a batched load sees of its batch
#[derive(Debug, Clone, Default)]
pub struct LoadBatch {
    /// Resolved once the whole batch has been processed
    pub ready: ReadyBarrier,
    /// Identities indexed when this entry started loading
    pub registered: HashSet<PluginId>,
}

/// Outcome of one `register` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterReport {
    /// Plugins that were loaded and indexed, in batch order
    pub loaded: Vec<PluginId>,
    /// Plugins that failed and were not indexed
    pub failed: Vec<(PluginId, PluginError)>,
}

impl RegisterReport {
    pub fn attempted(&self) -> usize {
        self.loaded.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
