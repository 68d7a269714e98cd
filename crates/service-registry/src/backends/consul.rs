//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Consul KV registry backend implementation
//!
//! Talks to the Consul KV HTTP API. Keys are flat: branches are found with a
//! separator listing of the base prefix, leaves with a recursive listing of
//! each branch, and the service name is parsed back out of every leaf key.

use super::trait_def::{Leaf, RegistryBackend};
use crate::{
    error::{RegistryError, RegistryResult},
    keys::{
        flat_branches, flat_key, http_endpoint, normalize_base_path, segment_url, split_leaf_key,
        KeyLayout,
    },
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client as HttpClient, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// One entry of a Consul KV listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsulKvPair {
    key: String,
    #[serde(default)]
    value: Option<String>,
}

/// Consul KV registry backend
pub struct ConsulBackend {
    http_client: HttpClient,
    endpoint: String,
    base_path: String,
    initialized: bool,
}

impl ConsulBackend {
    pub fn new(registry_url: &str, base_path: &str) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint: http_endpoint(registry_url),
            base_path: normalize_base_path(base_path, KeyLayout::Flat),
            initialized: false,
        }
    }

    fn ensure_initialized(&self) -> RegistryResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(RegistryError::BackendUnavailable(
                "Consul backend not initialized".to_string(),
            ))
        }
    }

    /// KV endpoint of a full key, one encoded path segment per key segment
    fn kv_url(&self, key: &str) -> RegistryResult<Url> {
        segment_url(&self.endpoint, ["v1", "kv"].into_iter().chain(key.split('/')))
    }

    /// GET a KV path; `None` when Consul answers 404
    async fn make_kv_request(
        &self,
        key: &str,
        query: &[(&str, &str)],
    ) -> RegistryResult<Option<reqwest::Response>> {
        self.ensure_initialized()?;

        let response = self
            .http_client
            .get(self.kv_url(key)?)
            .query(query)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response)),
            status => Err(RegistryError::BackendIo(format!(
                "Consul KV request for {:?} failed: HTTP {}",
                key, status
            ))),
        }
    }

    fn decode_value(key: &str, value: Option<String>) -> Option<String> {
        let encoded = value?;
        match STANDARD.decode(encoded.as_bytes()) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                warn!("Consul returned a non-base64 value for {}: {}", key, e);
                None
            }
        }
    }
}

#[async_trait]
impl RegistryBackend for ConsulBackend {
    fn kind(&self) -> &'static str {
        "consul"
    }

    fn base_path(&self) -> &str {
        &self.base_path
    }

    async fn initialize(&mut self) -> RegistryResult<()> {
        info!("Initializing consul registry backend at {}", self.endpoint);

        let response = self
            .http_client
            .get(format!("{}/v1/agent/self", self.endpoint))
            .send()
            .await
            .map_err(|e| {
                RegistryError::BackendUnavailable(format!("Failed to connect to Consul: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(RegistryError::BackendUnavailable(format!(
                "Failed to connect to Consul: HTTP {}",
                response.status()
            )));
        }

        self.initialized = true;
        info!("Successfully connected to Consul");
        Ok(())
    }

    async fn list_branches(&self) -> RegistryResult<Vec<String>> {
        let Some(response) = self
            .make_kv_request(&self.base_path, &[("keys", ""), ("separator", "/")])
            .await?
        else {
            return Ok(Vec::new());
        };

        let keys: Vec<String> = response.json().await?;
        Ok(flat_branches(&self.base_path, keys.iter().map(String::as_str)))
    }

    async fn list_leaves(&self, branch: &str) -> RegistryResult<Vec<Leaf>> {
        let prefix = format!("{}{}/", self.base_path, branch);
        let Some(response) = self.make_kv_request(&prefix, &[("recurse", "")]).await? else {
            return Ok(Vec::new());
        };

        let pairs: Vec<ConsulKvPair> = response.json().await?;
        let mut leaves = Vec::with_capacity(pairs.len());
        for pair in pairs {
            if pair.key.ends_with('/') {
                continue;
            }
            match split_leaf_key(&self.base_path, &pair.key) {
                Some((name, address)) => {
                    let value = Self::decode_value(&pair.key, pair.value);
                    leaves.push(Leaf::new(name, address, value));
                }
                None => debug!("Ignoring key {} outside the service layout", pair.key),
            }
        }

        Ok(leaves)
    }

    async fn read_leaf(&self, name: &str, address: &str) -> RegistryResult<String> {
        let key = flat_key(&self.base_path, name, address);
        match self.make_kv_request(&key, &[("raw", "")]).await? {
            Some(response) => Ok(response.text().await?),
            None => Err(RegistryError::NotFound(key)),
        }
    }

    async fn write_leaf(&self, name: &str, address: &str, value: &str) -> RegistryResult<()> {
        self.ensure_initialized()?;

        let key = flat_key(&self.base_path, name, address);
        let response = self
            .http_client
            .put(self.kv_url(&key)?)
            .body(value.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RegistryError::BackendIo(format!(
                "Failed to write {} to Consul: HTTP {} - {}",
                key, status, error_text
            )));
        }

        let accepted: bool = response.json().await?;
        if !accepted {
            return Err(RegistryError::BackendIo(format!(
                "Consul rejected the write to {}",
                key
            )));
        }

        Ok(())
    }

    async fn health_check(&self) -> RegistryResult<bool> {
        self.ensure_initialized()?;
        debug!("Performing health check on Consul backend");

        let response = self
            .http_client
            .get(format!("{}/v1/status/leader", self.endpoint))
            .send()
            .await?;

        Ok(response.status().is_success())
    }
}
