//! RTE Inventory - Per-node NUMA resource inventory
//!
//! Resource inventory layer of a resource-topology exporter. It tells a
//! NUMA-aware scheduler what each node can allocate and what every container
//! already holds, per NUMA node.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Shared-Pool Filter                       │
//! │          (removes the shared CPU pool from listings)         │
//! ├──────────────────────────────────────────────────────────────┤
//! │                    Sysinfo Fallback                          │
//! │     (allocatable capacity from sysfs on primary failure)     │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │   Primary Provider           │   System Inventory            │
//! │   (kubelet podresources,     │   ┌─────┐ ┌─────┐ ┌─────────┐ │
//! │    snapshot, unavailable)    │   │ CPU │ │ PCI │ │Hugepages│ │
//! │                              │   └─────┘ └─────┘ └─────────┘ │
//! └──────────────────────────────┴───────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`provider`]: Provider chain decorators and standalone providers
//! - [`hardware`]: CPU sets, sysfs discovery and the system inventory
//! - [`config`]: Resource mapping and exporter configuration
//! - [`domain`]: Core domain types and traits
//! - [`error`]: Error types and handling

pub mod config;
pub mod domain;
pub mod error;
pub mod hardware;
pub mod provider;

// Re-export commonly used types
pub use config::{ExporterConfig, ResourcesConfig};

pub use domain::ports::{
    HostProbe, HostProbeRef, NumaNode, PodResourcesProvider, PodResourcesProviderRef,
    ResourceMap,
};

pub use error::{Error, ErrorKind, Result};

pub use hardware::{CpuSet, SysInfo, SysfsConfig, SysfsProbe};

pub use provider::{
    ContainerIdent, FilterEvent, ProviderChain, SharedPoolFilter, SnapshotProvider,
    SysInfoFallback, UnavailableProvider,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
