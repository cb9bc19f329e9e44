//! Pod Resources API Types
//!
//! Request and response shapes of the kubelet podresources v1 API, as
//! consumed and re-exposed by the provider chain.

use serde::{Deserialize, Serialize};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPodResourcesRequest {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatableResourcesRequest {}

// =============================================================================
// List Response
// =============================================================================

/// Resources assigned to every pod on the node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPodResourcesResponse {
    #[serde(default)]
    pub pod_resources: Vec<PodResources>,
}

/// Resources assigned to one pod
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodResources {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub containers: Vec<ContainerResources>,
}

/// Resources assigned to one container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerResources {
    pub name: String,
    #[serde(default)]
    pub devices: Vec<ContainerDevices>,
    #[serde(default)]
    pub cpu_ids: Vec<i64>,
}

// =============================================================================
// Allocatable Response
// =============================================================================

/// Aggregate allocatable capacity of the node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatableResourcesResponse {
    #[serde(default)]
    pub devices: Vec<ContainerDevices>,
    #[serde(default)]
    pub cpu_ids: Vec<i64>,
}

// =============================================================================
// Devices & Topology
// =============================================================================

/// A group of devices of one resource with their NUMA locality
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDevices {
    pub resource_name: String,
    #[serde(default)]
    pub device_ids: Vec<String>,
    #[serde(default)]
    pub topology: Option<TopologyInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyInfo {
    #[serde(default)]
    pub nodes: Vec<NumaNodeInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumaNodeInfo {
    pub id: i64,
}

impl TopologyInfo {
    /// Topology naming exactly one NUMA node
    pub fn single(id: i64) -> Self {
        Self {
            nodes: vec![NumaNodeInfo { id }],
        }
    }
}
