//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Registry backend trait definition

use crate::{
    codec::{self, STATE_KEY},
    error::{RegistryError, RegistryResult},
    model::{ServiceListing, ServiceRecord, ServiceState},
};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

/// A leaf found under a service branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    /// Service name the leaf belongs to
    pub name: String,

    /// Address segment of the leaf key
    pub address: String,

    /// Stored value, `None` when the node carries no value at all
    pub value: Option<String>,
}

impl Leaf {
    pub fn new(name: impl Into<String>, address: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            value,
        }
    }
}

/// Trait for registry backends.
///
/// Implementations provide the native list/get/put primitives and their key
/// layout; the listing walk and the state/metadata mutations are shared.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Short backend name used in logs
    fn kind(&self) -> &'static str;

    /// Normalized base path of the service tree
    fn base_path(&self) -> &str;

    /// Connect to the coordination service
    async fn initialize(&mut self) -> RegistryResult<()>;

    /// List the service branches directly under the base path
    async fn list_branches(&self) -> RegistryResult<Vec<String>>;

    /// List the leaves of one branch together with their values
    async fn list_leaves(&self, branch: &str) -> RegistryResult<Vec<Leaf>>;

    /// Read the raw value of one leaf
    async fn read_leaf(&self, name: &str, address: &str) -> RegistryResult<String>;

    /// Overwrite the raw value of one leaf
    async fn write_leaf(&self, name: &str, address: &str, value: &str) -> RegistryResult<()>;

    /// Health check for the backend
    async fn health_check(&self) -> RegistryResult<bool>;

    /// Walk the service tree and report branches or leaves that could not be read
    async fn scan_services(&self) -> ServiceListing {
        let mut listing = ServiceListing::default();

        let branches = match self.list_branches().await {
            Ok(branches) => branches,
            Err(RegistryError::NotFound(_)) => {
                debug!("Base path {:?} does not exist in {}", self.base_path(), self.kind());
                return listing;
            }
            Err(e) => {
                warn!("Failed to list services {:?}: {}", self.base_path(), e);
                listing.failed_branches.push(self.base_path().to_string());
                return listing;
            }
        };

        for branch in branches {
            let leaves = match self.list_leaves(&branch).await {
                Ok(leaves) => leaves,
                Err(RegistryError::NotFound(_)) => continue,
                Err(e) => {
                    warn!("Failed to list {:?}: {}", branch, e);
                    listing.failed_branches.push(branch);
                    continue;
                }
            };

            for leaf in leaves {
                match ServiceRecord::from_leaf(&leaf.name, &leaf.address, leaf.value.as_deref()) {
                    Ok(record) => listing.services.push(record),
                    Err(e) => {
                        warn!("Skipping {}/{}: {}", leaf.name, leaf.address, e);
                        listing.skipped_leaves += 1;
                    }
                }
            }
        }

        debug!(
            "Discovered {} services from {}",
            listing.services.len(),
            self.kind()
        );
        listing
    }

    /// List every service instance that could be read
    async fn fetch_services(&self) -> Vec<ServiceRecord> {
        self.scan_services().await.services
    }

    /// Mark an instance inactive, keeping its other metadata
    async fn deactivate_service(&self, name: &str, address: &str) -> RegistryResult<()> {
        self.set_state(name, address, ServiceState::Inactive).await
    }

    /// Mark an instance active, keeping its other metadata
    async fn activate_service(&self, name: &str, address: &str) -> RegistryResult<()> {
        self.set_state(name, address, ServiceState::Active).await
    }

    /// Replace the stored value of an existing leaf verbatim
    async fn update_metadata(&self, name: &str, address: &str, metadata: &str) -> RegistryResult<()> {
        self.read_leaf(name, address).await?;
        self.write_leaf(name, address, metadata).await.map_err(|e| {
            error!("Failed to update metadata of {}/{}: {}", name, address, e);
            e
        })?;

        info!("Updated metadata of {}/{} in {}", name, address, self.kind());
        Ok(())
    }

    /// Read-modify-write of the `state` key
    async fn set_state(&self, name: &str, address: &str, state: ServiceState) -> RegistryResult<()> {
        let raw = self.read_leaf(name, address).await?;
        let mut metadata = codec::decode_metadata(&raw).map_err(|e| {
            warn!("Value of {}/{} is not valid metadata: {}", name, address, e);
            e
        })?;

        metadata.insert(STATE_KEY.to_string(), state.as_str().to_string());
        self.write_leaf(name, address, &codec::encode_metadata(&metadata))
            .await
            .map_err(|e| {
                error!("Failed to set {}/{} {}: {}", name, address, state, e);
                e
            })?;

        info!("Set {}/{} {} in {}", name, address, state, self.kind());
        Ok(())
    }
}
