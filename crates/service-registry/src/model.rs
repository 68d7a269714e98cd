//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Backend-agnostic service records

use crate::codec::{self, Metadata, GROUP_KEY, STATE_KEY};
use crate::error::RegistryResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operational state of a service instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Active,
    Inactive,
    Unknown,
}

impl ServiceState {
    /// Value written under the `state` metadata key
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Active => "active",
            ServiceState::Inactive => "inactive",
            ServiceState::Unknown => "unknown",
        }
    }

    /// State carried by a decoded metadata set; no `state` key means active
    pub fn from_metadata(metadata: &Metadata) -> Self {
        match metadata.get(STATE_KEY).map(String::as_str) {
            None | Some("") | Some("active") => ServiceState::Active,
            Some("inactive") => ServiceState::Inactive,
            Some(_) => ServiceState::Unknown,
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One registered service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Opaque identifier derived from name and address
    pub id: String,

    /// Logical service name
    pub name: String,

    /// Network endpoint of this instance
    pub address: String,

    /// Raw value stored at the leaf
    pub metadata_raw: String,

    /// Operational state
    pub state: ServiceState,

    /// Classification label
    pub group: Option<String>,
}

impl ServiceRecord {
    /// Build a record from a listed leaf.
    ///
    /// A leaf without a value is reported with an unknown state. A value that
    /// does not decode is an error; listings skip such leaves.
    pub fn from_leaf(name: &str, address: &str, value: Option<&str>) -> RegistryResult<Self> {
        let id = codec::encode_id(name, address);

        let Some(raw) = value else {
            return Ok(Self {
                id,
                name: name.to_string(),
                address: address.to_string(),
                metadata_raw: String::new(),
                state: ServiceState::Unknown,
                group: None,
            });
        };

        let metadata = codec::decode_metadata(raw)?;
        Ok(Self {
            id,
            name: name.to_string(),
            address: address.to_string(),
            metadata_raw: raw.to_string(),
            state: ServiceState::from_metadata(&metadata),
            group: metadata.get(GROUP_KEY).filter(|g| !g.is_empty()).cloned(),
        })
    }

    /// Decoded metadata of this record
    pub fn metadata(&self) -> RegistryResult<Metadata> {
        codec::decode_metadata(&self.metadata_raw)
    }

    pub fn is_active(&self) -> bool {
        self.state == ServiceState::Active
    }
}

/// Result of a registry walk, with a report of what could not be read
#[derive(Debug, Clone, Default)]
pub struct ServiceListing {
    /// Records assembled from every readable leaf
    pub services: Vec<ServiceRecord>,

    /// Branches whose listing failed and contributed no records
    pub failed_branches: Vec<String>,

    /// Leaves dropped because their metadata did not decode
    pub skipped_leaves: usize,
}

impl ServiceListing {
    /// True when every branch was listed and every leaf decoded
    pub fn is_complete(&self) -> bool {
        self.failed_branches.is_empty() && self.skipped_leaves == 0
    }
}
