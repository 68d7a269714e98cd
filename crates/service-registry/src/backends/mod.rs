//! SPDX-FileCopyrightText: © 2025 Cory Parent <goedelsoup+orasi@goedelsoup.io>
//! SPDX-License-Identifier: Apache-2.0
//!

//! Registry backend implementations

pub mod consul;
pub mod etcd;
pub mod etcdv3;
pub mod factory;
pub mod memory;
pub mod trait_def;
pub mod zookeeper;

// Re-export main types for convenience
pub use consul::ConsulBackend;
pub use etcd::EtcdBackend;
pub use etcdv3::EtcdV3Backend;
pub use factory::BackendFactory;
pub use memory::MemoryBackend;
pub use trait_def::{Leaf, RegistryBackend};
pub use zookeeper::ZooKeeperBackend;
