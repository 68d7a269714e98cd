//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Registry configuration
//!
//! The configuration names one backend, where to reach it and the base path
//! of the service tree. Field names match the JSON config used by the web
//! console, so its `config.json` can be read as-is; fields this crate does
//! not use (host, port, credentials) are ignored.

use crate::error::{RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Environment variable prefix, e.g. `SERVICE_REGISTRY_REGISTRY_URL`
pub const ENV_PREFIX: &str = "SERVICE_REGISTRY";

/// Supported coordination services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryType {
    ZooKeeper,
    Etcd,
    EtcdV3,
    Consul,
}

impl RegistryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryType::ZooKeeper => "zookeeper",
            RegistryType::Etcd => "etcd",
            RegistryType::EtcdV3 => "etcdv3",
            RegistryType::Consul => "consul",
        }
    }
}

impl fmt::Display for RegistryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for RegistryType {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zookeeper" => Ok(RegistryType::ZooKeeper),
            "etcd" => Ok(RegistryType::Etcd),
            "etcdv3" => Ok(RegistryType::EtcdV3),
            "consul" => Ok(RegistryType::Consul),
            other => Err(RegistryError::Configuration(format!(
                "unsupported registry: {}",
                other
            ))),
        }
    }
}

/// Configuration for the registry facade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Backend to connect to
    pub registry_type: RegistryType,

    /// Backend address(es), comma separated
    pub registry_url: String,

    /// Base path of the service tree
    pub service_base_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_type: RegistryType::ZooKeeper,
            registry_url: "localhost:2181".to_string(),
            service_base_url: "/rpcx".to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn new(
        registry_type: RegistryType,
        registry_url: impl Into<String>,
        service_base_url: impl Into<String>,
    ) -> Self {
        Self {
            registry_type,
            registry_url: registry_url.into(),
            service_base_url: service_base_url.into(),
        }
    }

    /// Load configuration from a JSON or TOML file, with environment overrides
    pub fn from_file(path: &Path) -> RegistryResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .map_err(|e| {
                RegistryError::Configuration(format!("{} (config file: {})", e, path.display()))
            })?;

        let config: Self = settings.try_deserialize().map_err(|e| {
            RegistryError::Configuration(format!("{} (config file: {})", e, path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> RegistryResult<Self> {
        let defaults = Self::default();
        let settings = config::Config::builder()
            .set_default("registry_type", defaults.registry_type.as_str())?
            .set_default("registry_url", defaults.registry_url)?
            .set_default("service_base_url", defaults.service_base_url)?
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> RegistryResult<()> {
        if self.registry_url.trim().is_empty() {
            return Err(RegistryError::Configuration(
                "registry_url: cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
