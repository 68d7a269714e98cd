//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Registry facade
//!
//! Owns the configuration and the live backend, and exposes the four
//! registry operations either by `(name, address)` or by opaque identifier.

use crate::{
    backends::{BackendFactory, RegistryBackend},
    codec,
    config::RegistryConfig,
    error::RegistryResult,
    model::{ServiceListing, ServiceRecord},
};
use tracing::{error, info};

/// Service registry facade over one backend
pub struct Registry {
    config: RegistryConfig,
    backend: Box<dyn RegistryBackend>,
}

impl Registry {
    /// Build and initialize the backend selected by `config`
    pub async fn connect(config: RegistryConfig) -> RegistryResult<Self> {
        let backend = Self::open(&config).await?;
        Ok(Self { config, backend })
    }

    /// Initialize an externally built backend
    pub async fn with_backend(
        config: RegistryConfig,
        backend: Box<dyn RegistryBackend>,
    ) -> RegistryResult<Self> {
        let backend = Self::initialize(backend).await?;
        Ok(Self { config, backend })
    }

    /// Switch to a new configuration.
    ///
    /// The current backend stays in place if the new one cannot be built or initialized.
    pub async fn reload(&mut self, config: RegistryConfig) -> RegistryResult<()> {
        let backend = Self::open(&config).await?;
        self.swap(config, backend);
        Ok(())
    }

    /// Switch to a new configuration served by an externally built backend
    pub async fn reload_with(
        &mut self,
        config: RegistryConfig,
        backend: Box<dyn RegistryBackend>,
    ) -> RegistryResult<()> {
        let backend = Self::initialize(backend).await?;
        self.swap(config, backend);
        Ok(())
    }

    async fn open(config: &RegistryConfig) -> RegistryResult<Box<dyn RegistryBackend>> {
        let backend = BackendFactory::create_backend(config)?;
        Self::initialize(backend).await
    }

    async fn initialize(
        mut backend: Box<dyn RegistryBackend>,
    ) -> RegistryResult<Box<dyn RegistryBackend>> {
        backend.initialize().await.map_err(|e| {
            error!("Failed to initialize {} backend: {}", backend.kind(), e);
            e
        })?;
        Ok(backend)
    }

    fn swap(&mut self, config: RegistryConfig, backend: Box<dyn RegistryBackend>) {
        info!(
            "Switching registry from {} to {} at {}",
            self.backend.kind(),
            backend.kind(),
            config.registry_url
        );
        self.config = config;
        self.backend = backend;
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Kind of the live backend
    pub fn kind(&self) -> &'static str {
        self.backend.kind()
    }

    pub async fn fetch_services(&self) -> Vec<ServiceRecord> {
        self.backend.fetch_services().await
    }

    pub async fn scan_services(&self) -> ServiceListing {
        self.backend.scan_services().await
    }

    pub async fn activate_service(&self, name: &str, address: &str) -> RegistryResult<()> {
        self.backend.activate_service(name, address).await
    }

    pub async fn deactivate_service(&self, name: &str, address: &str) -> RegistryResult<()> {
        self.backend.deactivate_service(name, address).await
    }

    pub async fn update_metadata(
        &self,
        name: &str,
        address: &str,
        metadata: &str,
    ) -> RegistryResult<()> {
        self.backend.update_metadata(name, address, metadata).await
    }

    pub async fn health_check(&self) -> RegistryResult<bool> {
        self.backend.health_check().await
    }

    pub async fn activate_by_id(&self, id: &str) -> RegistryResult<()> {
        let (name, address) = codec::decode_id(id)?;
        self.activate_service(&name, &address).await
    }

    pub async fn deactivate_by_id(&self, id: &str) -> RegistryResult<()> {
        let (name, address) = codec::decode_id(id)?;
        self.deactivate_service(&name, &address).await
    }

    pub async fn update_metadata_by_id(&self, id: &str, metadata: &str) -> RegistryResult<()> {
        let (name, address) = codec::decode_id(id)?;
        self.update_metadata(&name, &address, metadata).await
    }
}
