//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Registry backend factory implementation

use super::consul::ConsulBackend;
use super::etcd::EtcdBackend;
use super::etcdv3::EtcdV3Backend;
use super::trait_def::RegistryBackend;
use super::zookeeper::ZooKeeperBackend;
use crate::config::{RegistryConfig, RegistryType};
use crate::error::RegistryResult;
use tracing::debug;

/// Factory for creating registry backends
pub struct BackendFactory;

impl BackendFactory {
    /// Build the backend selected by `config`; the result still has to be initialized
    pub fn create_backend(config: &RegistryConfig) -> RegistryResult<Box<dyn RegistryBackend>> {
        config.validate()?;
        debug!(
            "Creating {} backend for {} under {:?}",
            config.registry_type, config.registry_url, config.service_base_url
        );

        let backend: Box<dyn RegistryBackend> = match config.registry_type {
            RegistryType::ZooKeeper => Box::new(ZooKeeperBackend::new(
                config.registry_url.trim(),
                &config.service_base_url,
            )),
            RegistryType::Etcd => Box::new(EtcdBackend::new(
                &config.registry_url,
                &config.service_base_url,
            )),
            RegistryType::EtcdV3 => Box::new(EtcdV3Backend::new(
                &config.registry_url,
                &config.service_base_url,
            )),
            RegistryType::Consul => Box::new(ConsulBackend::new(
                &config.registry_url,
                &config.service_base_url,
            )),
        };

        Ok(backend)
    }
}
