//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! ZooKeeper registry backend implementation

use super::trait_def::{Leaf, RegistryBackend};
use crate::{
    error::{RegistryError, RegistryResult},
    keys::{join_path, normalize_base_path, KeyLayout},
};
use async_trait::async_trait;
use tracing::{debug, info};
use zookeeper_client as zk;

/// ZooKeeper registry backend
pub struct ZooKeeperBackend {
    client: Option<zk::Client>,
    connect_string: String,
    base_path: String,
}

impl ZooKeeperBackend {
    pub fn new(connect_string: impl Into<String>, base_path: &str) -> Self {
        Self {
            client: None,
            connect_string: connect_string.into(),
            base_path: normalize_base_path(base_path, KeyLayout::Directory),
        }
    }

    fn client(&self) -> RegistryResult<&zk::Client> {
        self.client.as_ref().ok_or_else(|| {
            RegistryError::BackendUnavailable("ZooKeeper client not initialized".to_string())
        })
    }

    /// Absolute znode path for the given segments below the base path
    fn znode(&self, parts: &[&str]) -> String {
        let mut segments = vec![self.base_path.as_str()];
        segments.extend_from_slice(parts);
        format!("/{}", join_path(&segments))
    }
}

fn map_zk_error(path: &str, err: zk::Error) -> RegistryError {
    match err {
        zk::Error::NoNode => RegistryError::NotFound(path.to_string()),
        other => RegistryError::BackendIo(format!("{}: {}", path, other)),
    }
}

/// Turn the read of one listed child into a leaf.
///
/// A child removed between the listing and the read is dropped. Any other
/// failure fails the whole branch so the listing reports it.
fn listed_leaf(
    branch: &str,
    address: String,
    path: &str,
    data: Result<Vec<u8>, zk::Error>,
) -> RegistryResult<Option<Leaf>> {
    match data {
        Ok(data) => {
            let value = String::from_utf8_lossy(&data).into_owned();
            Ok(Some(Leaf::new(branch, address, Some(value))))
        }
        Err(zk::Error::NoNode) => {
            debug!("{} disappeared during listing", path);
            Ok(None)
        }
        Err(e) => Err(map_zk_error(path, e)),
    }
}

#[async_trait]
impl RegistryBackend for ZooKeeperBackend {
    fn kind(&self) -> &'static str {
        "zookeeper"
    }

    fn base_path(&self) -> &str {
        &self.base_path
    }

    async fn initialize(&mut self) -> RegistryResult<()> {
        info!("Initializing zookeeper registry backend at {}", self.connect_string);

        let client = zk::Client::connect(&self.connect_string).await.map_err(|e| {
            RegistryError::BackendUnavailable(format!(
                "Failed to connect to ZooKeeper at {}: {}",
                self.connect_string, e
            ))
        })?;
        self.client = Some(client);

        info!("Successfully connected to ZooKeeper");
        Ok(())
    }

    async fn list_branches(&self) -> RegistryResult<Vec<String>> {
        let path = self.znode(&[]);
        self.client()?
            .list_children(&path)
            .await
            .map_err(|e| map_zk_error(&path, e))
    }

    async fn list_leaves(&self, branch: &str) -> RegistryResult<Vec<Leaf>> {
        let client = self.client()?;
        let branch_path = self.znode(&[branch]);
        let children = client
            .list_children(&branch_path)
            .await
            .map_err(|e| map_zk_error(&branch_path, e))?;

        let mut leaves = Vec::with_capacity(children.len());
        for address in children {
            let path = self.znode(&[branch, &address]);
            let data = client.get_data(&path).await.map(|(data, _stat)| data);
            if let Some(leaf) = listed_leaf(branch, address, &path, data)? {
                leaves.push(leaf);
            }
        }

        Ok(leaves)
    }

    async fn read_leaf(&self, name: &str, address: &str) -> RegistryResult<String> {
        let path = self.znode(&[name, address]);
        let (data, _stat) = self
            .client()?
            .get_data(&path)
            .await
            .map_err(|e| map_zk_error(&path, e))?;

        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    async fn write_leaf(&self, name: &str, address: &str, value: &str) -> RegistryResult<()> {
        let path = self.znode(&[name, address]);
        self.client()?
            .set_data(&path, value.as_bytes(), None)
            .await
            .map_err(|e| map_zk_error(&path, e))?;

        Ok(())
    }

    async fn health_check(&self) -> RegistryResult<bool> {
        let client = self.client()?;
        match client.list_children("/").await {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!("ZooKeeper health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_znode_paths() {
        let backend = ZooKeeperBackend::new("localhost:2181", "/rpcx_test/");
        assert_eq!(backend.base_path(), "rpcx_test");
        assert_eq!(backend.znode(&[]), "/rpcx_test");
        assert_eq!(backend.znode(&["Arith"]), "/rpcx_test/Arith");
        assert_eq!(
            backend.znode(&["Arith", "tcp@127.0.0.1:8972"]),
            "/rpcx_test/Arith/tcp@127.0.0.1:8972"
        );
    }

    #[test]
    fn test_root_base_path() {
        let backend = ZooKeeperBackend::new("localhost:2181", "/");
        assert_eq!(backend.znode(&[]), "/");
        assert_eq!(backend.znode(&["Arith"]), "/Arith");
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            map_zk_error("/rpcx/a", zk::Error::NoNode),
            RegistryError::NotFound(_)
        ));
        assert!(matches!(
            map_zk_error("/rpcx/a", zk::Error::ConnectionLoss),
            RegistryError::BackendIo(_)
        ));
    }

    #[test]
    fn test_listed_leaf() {
        let leaf = listed_leaf("Arith", "a".to_string(), "/rpcx/Arith/a", Ok(b"weight=1".to_vec()))
            .unwrap();
        assert_eq!(leaf, Some(Leaf::new("Arith", "a", Some("weight=1".to_string()))));

        let vanished = listed_leaf("Arith", "a".to_string(), "/rpcx/Arith/a", Err(zk::Error::NoNode));
        assert_eq!(vanished.unwrap(), None);
    }

    #[test]
    fn test_unreadable_leaf_fails_the_branch() {
        let result = listed_leaf(
            "Arith",
            "a".to_string(),
            "/rpcx/Arith/a",
            Err(zk::Error::ConnectionLoss),
        );
        assert!(matches!(result, Err(RegistryError::BackendIo(_))));
    }

    #[tokio::test]
    async fn test_uninitialized_backend_is_unavailable() {
        let backend = ZooKeeperBackend::new("localhost:2181", "/rpcx");
        assert!(matches!(
            backend.read_leaf("Arith", "a").await,
            Err(RegistryError::BackendUnavailable(_))
        ));

        let listing = backend.scan_services().await;
        assert!(listing.services.is_empty());
        assert_eq!(listing.failed_branches, vec!["rpcx".to_string()]);
    }
}
