//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! In-memory registry backend
//!
//! Keeps a two-level tree of service names and addresses in process memory.
//! Clones share the same tree, so a handle kept outside the facade observes
//! every write made through it.

use super::trait_def::{Leaf, RegistryBackend};
use crate::error::{RegistryError, RegistryResult};
use crate::keys::{join_path, normalize_base_path, KeyLayout};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

type Tree = BTreeMap<String, BTreeMap<String, Option<String>>>;

/// In-memory registry backend
#[derive(Clone, Default)]
pub struct MemoryBackend {
    tree: Arc<RwLock<Tree>>,
    base_path: String,
}

impl MemoryBackend {
    pub fn new(base_path: &str) -> Self {
        Self {
            tree: Arc::new(RwLock::new(Tree::new())),
            base_path: normalize_base_path(base_path, KeyLayout::Directory),
        }
    }

    /// Register a leaf; this is how the tree is populated, the backend never creates nodes itself
    pub async fn insert(&self, name: &str, address: &str, value: Option<&str>) {
        let mut tree = self.tree.write().await;
        tree.entry(name.to_string())
            .or_default()
            .insert(address.to_string(), value.map(str::to_string));
    }

    /// Remove a leaf, dropping the branch once it is empty
    pub async fn remove(&self, name: &str, address: &str) -> bool {
        let mut tree = self.tree.write().await;
        let Some(branch) = tree.get_mut(name) else {
            return false;
        };
        let removed = branch.remove(address).is_some();
        if branch.is_empty() {
            tree.remove(name);
        }
        removed
    }

    /// Current raw value of a leaf
    pub async fn value(&self, name: &str, address: &str) -> Option<String> {
        let tree = self.tree.read().await;
        tree.get(name)?.get(address)?.clone()
    }

    fn leaf_path(&self, name: &str, address: &str) -> String {
        join_path(&[&self.base_path, name, address])
    }
}

#[async_trait]
impl RegistryBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn base_path(&self) -> &str {
        &self.base_path
    }

    async fn initialize(&mut self) -> RegistryResult<()> {
        info!(
            "Initializing in-memory registry backend with {} services",
            self.tree.read().await.len()
        );
        Ok(())
    }

    async fn list_branches(&self) -> RegistryResult<Vec<String>> {
        Ok(self.tree.read().await.keys().cloned().collect())
    }

    async fn list_leaves(&self, branch: &str) -> RegistryResult<Vec<Leaf>> {
        let tree = self.tree.read().await;
        let leaves = tree
            .get(branch)
            .ok_or_else(|| RegistryError::NotFound(join_path(&[&self.base_path, branch])))?;

        Ok(leaves
            .iter()
            .map(|(address, value)| Leaf::new(branch, address.clone(), value.clone()))
            .collect())
    }

    async fn read_leaf(&self, name: &str, address: &str) -> RegistryResult<String> {
        let tree = self.tree.read().await;
        match tree.get(name).and_then(|branch| branch.get(address)) {
            Some(value) => Ok(value.clone().unwrap_or_default()),
            None => Err(RegistryError::NotFound(self.leaf_path(name, address))),
        }
    }

    async fn write_leaf(&self, name: &str, address: &str, value: &str) -> RegistryResult<()> {
        let mut tree = self.tree.write().await;
        match tree.get_mut(name).and_then(|branch| branch.get_mut(address)) {
            Some(slot) => {
                *slot = Some(value.to_string());
                Ok(())
            }
            None => Err(RegistryError::NotFound(self.leaf_path(name, address))),
        }
    }

    async fn health_check(&self) -> RegistryResult<bool> {
        Ok(true)
    }
}
