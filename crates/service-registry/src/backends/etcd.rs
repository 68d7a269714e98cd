//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! etcd v2 registry backend implementation

use super::trait_def::{Leaf, RegistryBackend};
use crate::{
    error::{RegistryError, RegistryResult},
    keys::{http_endpoint, join_path, last_segment, normalize_base_path, segment_url, KeyLayout},
};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct EtcdResponse {
    node: EtcdNode,
}

#[derive(Debug, Deserialize)]
struct EtcdNode {
    key: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    dir: bool,
    #[serde(default)]
    nodes: Vec<EtcdNode>,
}

/// etcd v2 registry backend, speaking the `/v2/keys` HTTP API
pub struct EtcdBackend {
    http_client: HttpClient,
    endpoint: String,
    base_path: String,
    initialized: bool,
}

impl EtcdBackend {
    pub fn new(registry_url: &str, base_path: &str) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint: http_endpoint(registry_url),
            base_path: normalize_base_path(base_path, KeyLayout::Directory),
            initialized: false,
        }
    }

    /// `/v2/keys` URL of a node below the base path, each part a single encoded segment
    fn keys_url(&self, parts: &[&str]) -> RegistryResult<Url> {
        let mut segments = vec!["v2", "keys"];
        segments.extend(self.base_path.split('/').filter(|s| !s.is_empty()));
        segments.extend_from_slice(parts);
        if segments.len() == 2 {
            // the keyspace root is addressed with a trailing slash
            segments.push("");
        }
        segment_url(&self.endpoint, segments)
    }

    fn ensure_initialized(&self) -> RegistryResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(RegistryError::BackendUnavailable(
                "etcd backend not initialized".to_string(),
            ))
        }
    }

    async fn get_node(&self, parts: &[&str]) -> RegistryResult<EtcdNode> {
        self.ensure_initialized()?;

        let url = self.keys_url(parts)?;
        let response = self.http_client.get(url.clone()).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(RegistryError::NotFound(join_path(parts))),
            status if status.is_success() => {
                let body: EtcdResponse = response.json().await?;
                Ok(body.node)
            }
            status => Err(RegistryError::BackendIo(format!(
                "etcd request {} failed: HTTP {}",
                url, status
            ))),
        }
    }
}

#[async_trait]
impl RegistryBackend for EtcdBackend {
    fn kind(&self) -> &'static str {
        "etcd"
    }

    fn base_path(&self) -> &str {
        &self.base_path
    }

    async fn initialize(&mut self) -> RegistryResult<()> {
        info!("Initializing etcd registry backend at {}", self.endpoint);

        let response = self
            .http_client
            .get(format!("{}/version", self.endpoint))
            .send()
            .await
            .map_err(|e| {
                RegistryError::BackendUnavailable(format!("Failed to connect to etcd: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(RegistryError::BackendUnavailable(format!(
                "Failed to connect to etcd: HTTP {}",
                response.status()
            )));
        }

        self.initialized = true;
        info!("Successfully connected to etcd");
        Ok(())
    }

    async fn list_branches(&self) -> RegistryResult<Vec<String>> {
        let node = self.get_node(&[]).await?;
        Ok(node
            .nodes
            .iter()
            .filter(|child| child.dir)
            .map(|child| last_segment(&child.key).to_string())
            .collect())
    }

    async fn list_leaves(&self, branch: &str) -> RegistryResult<Vec<Leaf>> {
        let node = self.get_node(&[branch]).await?;
        Ok(node
            .nodes
            .into_iter()
            .filter(|child| !child.dir)
            .map(|child| Leaf::new(branch, last_segment(&child.key), child.value))
            .collect())
    }

    async fn read_leaf(&self, name: &str, address: &str) -> RegistryResult<String> {
        let node = self.get_node(&[name, address]).await?;
        if node.dir {
            return Err(RegistryError::NotFound(format!("{}/{} is a directory", name, address)));
        }
        Ok(node.value.unwrap_or_default())
    }

    async fn write_leaf(&self, name: &str, address: &str, value: &str) -> RegistryResult<()> {
        self.ensure_initialized()?;

        let url = self.keys_url(&[name, address])?;
        let response = self
            .http_client
            .put(url.clone())
            .form(&[("value", value), ("prevExist", "true")])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(RegistryError::NotFound(join_path(&[name, address]))),
            status if status.is_success() => Ok(()),
            status => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(RegistryError::BackendIo(format!(
                    "Failed to write {}: HTTP {} - {}",
                    url, status, error_text
                )))
            }
        }
    }

    async fn health_check(&self) -> RegistryResult<bool> {
        self.ensure_initialized()?;
        debug!("Performing health check on etcd backend");

        let response = self
            .http_client
            .get(format!("{}/health", self.endpoint))
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}
