//! Domain Ports - Core trait definitions for the resource inventory
//!
//! These traits define the boundaries between the inventory logic and the
//! outside world: the host's kernel interfaces on one side and the kubelet
//! pod-resources API on the other. Adapters implement these traits to provide
//! concrete functionality, and decorators implement them again on top of
//! another implementation.

use crate::domain::podresources::{
    AllocatableResourcesRequest, AllocatableResourcesResponse, ListPodResourcesRequest,
    ListPodResourcesResponse,
};
use crate::error::Result;
use crate::hardware::cpuset::CpuSet;
use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// NUMA Locality
// =============================================================================

/// NUMA affinity of a resource
///
/// `Unknown` is a distinct value and is never conflated with node 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumaNode {
    Unknown,
    Node(u32),
}

impl NumaNode {
    /// Topology id used on the wire for [`NumaNode::Unknown`]
    pub const UNKNOWN_ID: i64 = -1;

    /// Interpret a raw kernel value, where any negative number means "no affinity"
    pub fn from_raw(raw: i64) -> Self {
        u32::try_from(raw).map_or(NumaNode::Unknown, NumaNode::Node)
    }

    /// Node id, `None` when the affinity is unknown
    pub fn id(&self) -> Option<u32> {
        match self {
            NumaNode::Unknown => None,
            NumaNode::Node(id) => Some(*id),
        }
    }

    /// Id as reported in a topology annotation
    pub fn topology_id(&self) -> i64 {
        match self {
            NumaNode::Unknown => Self::UNKNOWN_ID,
            NumaNode::Node(id) => i64::from(*id),
        }
    }
}

impl From<Option<u32>> for NumaNode {
    fn from(node: Option<u32>) -> Self {
        node.map_or(NumaNode::Unknown, NumaNode::Node)
    }
}

impl std::fmt::Display for NumaNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumaNode::Unknown => write!(f, "unknown"),
            NumaNode::Node(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for NumaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.topology_id())
    }
}

// =============================================================================
// Inventory Types
// =============================================================================

/// NUMA node -> device identifiers, in enumeration order
pub type PerNumaDevices = BTreeMap<NumaNode, Vec<String>>;

/// Resource name -> per-NUMA devices
pub type ResourceMap = BTreeMap<String, PerNumaDevices>;

/// Device identity (`"vendor:product"` or `"vendor"`) -> resource name
pub type ResourceIdentityMap = BTreeMap<String, String>;

/// A PCI device as seen by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PciDevice {
    /// Bus address (e.g., 0000:00:02.0)
    pub address: String,
    /// Vendor id as lowercase hex without prefix (e.g., 8086)
    pub vendor_id: String,
    /// Product id as lowercase hex without prefix (e.g., 1520)
    pub product_id: String,
    /// Owning NUMA node, if the platform reports one
    pub numa_node: Option<u32>,
}

/// One hugepage pool on one NUMA node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HugepagePool {
    pub node_id: u32,
    pub size_kb: u64,
    pub total: u64,
}

// =============================================================================
// Host Probe Port
// =============================================================================

/// Port for reading the host's kernel-exposed inventory
///
/// Calls are synchronous and blocking; async callers should run them on a
/// blocking thread.
pub trait HostProbe: Send + Sync {
    /// CPUs currently online
    fn online_cpus(&self) -> Result<CpuSet>;

    /// All PCI devices
    fn pci_devices(&self) -> Result<Vec<PciDevice>>;

    /// Hugepage pools of every NUMA node
    fn hugepages(&self) -> Result<Vec<HugepagePool>>;
}

// =============================================================================
// Pod Resources Provider Port
// =============================================================================

/// Port for the kubelet pod-resources API and its decorators
#[async_trait]
pub trait PodResourcesProvider: Send + Sync {
    /// Per-pod, per-container resource assignments
    async fn list(&self, request: ListPodResourcesRequest) -> Result<ListPodResourcesResponse>;

    /// Aggregate allocatable capacity of the node
    async fn get_allocatable_resources(
        &self,
        request: AllocatableResourcesRequest,
    ) -> Result<AllocatableResourcesResponse>;

    /// Get provider name
    fn provider_name(&self) -> &str;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type HostProbeRef = Arc<dyn HostProbe>;
pub type PodResourcesProviderRef = Arc<dyn PodResourcesProvider>;
