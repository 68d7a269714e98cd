//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! etcd v3 registry backend implementation
//!
//! The v3 keyspace is flat. Branches are derived from a keys-only prefix scan
//! of the base, leaves from a prefix scan of each branch.

use super::trait_def::{Leaf, RegistryBackend};
use crate::{
    error::{RegistryError, RegistryResult},
    keys::{endpoints, flat_branches, flat_key, normalize_base_path, split_leaf_key, KeyLayout},
};
use async_trait::async_trait;
use etcd_client::{Client as EtcdClient, ConnectOptions, GetOptions, PutOptions};
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

/// etcd v3 registry backend
pub struct EtcdV3Backend {
    client: Option<EtcdClient>,
    endpoints: Vec<String>,
    base_path: String,
}

impl EtcdV3Backend {
    pub fn new(registry_url: &str, base_path: &str) -> Self {
        Self {
            client: None,
            endpoints: endpoints(registry_url),
            base_path: normalize_base_path(base_path, KeyLayout::Flat),
        }
    }

    /// The gRPC client is cheap to clone and its calls need `&mut`
    fn client(&self) -> RegistryResult<EtcdClient> {
        self.client.clone().ok_or_else(|| {
            RegistryError::BackendUnavailable("etcd v3 client not initialized".to_string())
        })
    }
}

/// Leaf for a key found under `base`, `None` when the key is not `name/address` shaped
fn leaf_from_kv(base: &str, key: &str, value: &[u8]) -> Option<Leaf> {
    let (name, address) = split_leaf_key(base, key)?;
    Some(Leaf::new(name, address, Some(String::from_utf8_lossy(value).into_owned())))
}

fn io_error(context: &str, err: etcd_client::Error) -> RegistryError {
    RegistryError::BackendIo(format!("{}: {}", context, err))
}

#[async_trait]
impl RegistryBackend for EtcdV3Backend {
    fn kind(&self) -> &'static str {
        "etcdv3"
    }

    fn base_path(&self) -> &str {
        &self.base_path
    }

    async fn initialize(&mut self) -> RegistryResult<()> {
        info!("Initializing etcd v3 registry backend at {:?}", self.endpoints);

        let connect_options = ConnectOptions::new()
            .with_timeout(StdDuration::from_secs(5))
            .with_keep_alive(StdDuration::from_secs(30), StdDuration::from_secs(10));

        let mut client = EtcdClient::connect(self.endpoints.clone(), Some(connect_options))
            .await
            .map_err(|e| {
                RegistryError::BackendUnavailable(format!("Failed to connect to etcd: {}", e))
            })?;

        client.status().await.map_err(|e| {
            RegistryError::BackendUnavailable(format!("etcd endpoint is not serving: {}", e))
        })?;

        self.client = Some(client);
        info!("Successfully connected to etcd v3");
        Ok(())
    }

    async fn list_branches(&self) -> RegistryResult<Vec<String>> {
        let mut client = self.client()?;
        let response = client
            .get(
                self.base_path.as_str(),
                Some(GetOptions::new().with_prefix().with_keys_only()),
            )
            .await
            .map_err(|e| io_error(&self.base_path, e))?;

        let keys = response.kvs().iter().filter_map(|kv| match kv.key_str() {
            Ok(key) => Some(key),
            Err(e) => {
                warn!("Ignoring non UTF-8 key under {:?}: {}", self.base_path, e);
                None
            }
        });

        Ok(flat_branches(&self.base_path, keys))
    }

    async fn list_leaves(&self, branch: &str) -> RegistryResult<Vec<Leaf>> {
        let prefix = format!("{}{}/", self.base_path, branch);
        let mut client = self.client()?;
        let response = client
            .get(prefix.as_str(), Some(GetOptions::new().with_prefix()))
            .await
            .map_err(|e| io_error(&prefix, e))?;

        let mut leaves = Vec::with_capacity(response.kvs().len());
        for kv in response.kvs() {
            let Ok(key) = kv.key_str() else {
                warn!("Ignoring non UTF-8 key under {:?}", prefix);
                continue;
            };
            match leaf_from_kv(&self.base_path, key, kv.value()) {
                Some(leaf) => leaves.push(leaf),
                None => debug!("Ignoring key {} outside the service layout", key),
            }
        }

        Ok(leaves)
    }

    async fn read_leaf(&self, name: &str, address: &str) -> RegistryResult<String> {
        let key = flat_key(&self.base_path, name, address);
        let mut client = self.client()?;
        let response = client
            .get(key.as_str(), None)
            .await
            .map_err(|e| io_error(&key, e))?;

        match response.kvs().first() {
            Some(kv) => Ok(String::from_utf8_lossy(kv.value()).into_owned()),
            None => Err(RegistryError::NotFound(key)),
        }
    }

    async fn write_leaf(&self, name: &str, address: &str, value: &str) -> RegistryResult<()> {
        let key = flat_key(&self.base_path, name, address);
        let mut client = self.client()?;
        client
            .put(key.as_str(), value, Some(PutOptions::new()))
            .await
            .map_err(|e| io_error(&key, e))?;

        Ok(())
    }

    async fn health_check(&self) -> RegistryResult<bool> {
        let mut client = self.client()?;
        match client.status().await {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!("etcd v3 health check failed: {}", e);
                Ok(false)
            }
        }
    }
}
