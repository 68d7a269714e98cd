//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Uniform service registry over ZooKeeper, Consul and etcd
//!
//! Services are stored as a two-level tree `base/name/address` whose leaves
//! hold URL-encoded metadata. This crate lists the registered instances and
//! lets callers activate, deactivate or rewrite them without caring which
//! coordination service holds the tree.

pub mod backends;
pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod model;
pub mod registry;

// Re-export main types
pub use backends::{BackendFactory, MemoryBackend, RegistryBackend};
pub use codec::{decode_id, decode_metadata, encode_id, encode_metadata, Metadata};
pub use config::{RegistryConfig, RegistryType};
pub use error::{RegistryError, RegistryResult};
pub use model::{ServiceListing, ServiceRecord, ServiceState};
pub use registry::Registry;

/// Registry version information
pub const REGISTRY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Registry name
pub const REGISTRY_NAME: &str = "service-registry";

/// Connect a registry facade for `config`
pub async fn init_registry(config: RegistryConfig) -> RegistryResult<Registry> {
    tracing::info!(
        "Initializing {} v{} with {} backend",
        REGISTRY_NAME,
        REGISTRY_VERSION,
        config.registry_type
    );

    let registry = Registry::connect(config).await?;
    tracing::info!("Registry initialization completed");

    Ok(registry)
}
