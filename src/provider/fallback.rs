//! Sysinfo Fallback Provider
//!
//! Serves the node's allocatable resources from sysfs when the primary
//! provider cannot. Per-pod listing is never served from sysfs.

use crate::config::ResourcesConfig;
use crate::domain::podresources::{
    AllocatableResourcesRequest, AllocatableResourcesResponse, ContainerDevices,
    ListPodResourcesRequest, ListPodResourcesResponse, TopologyInfo,
};
use crate::domain::ports::{HostProbeRef, PodResourcesProvider, PodResourcesProviderRef};
use crate::error::{Error, Result};
use crate::hardware::sysinfo::SysInfo;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Decorator answering `get_allocatable_resources` from sysfs on primary failure
pub struct SysInfoFallback {
    inner: PodResourcesProviderRef,
    config: Arc<ResourcesConfig>,
    probe: HostProbeRef,
    name: String,
}

impl SysInfoFallback {
    /// Wrap `inner`, probing the host through `probe` when it fails
    pub fn new(
        inner: PodResourcesProviderRef,
        config: ResourcesConfig,
        probe: HostProbeRef,
    ) -> Self {
        let name = format!("sysinfo({})", inner.provider_name());
        Self {
            inner,
            config: Arc::new(config),
            probe,
            name,
        }
    }

    /// Build a fresh inventory on a blocking thread
    async fn allocatable_from_sysinfo(&self) -> Result<AllocatableResourcesResponse> {
        let config = self.config.clone();
        let probe = self.probe.clone();

        let sysinfo = tokio::task::spawn_blocking(move || SysInfo::build(&config, probe.as_ref()))
            .await
            .map_err(|e| Error::Internal(format!("sysinfo task failed: {}", e)))??;

        debug!("sysinfo fallback inventory:\n{}", sysinfo);
        Ok(allocatable_response_from_sysinfo(&sysinfo))
    }
}

#[async_trait]
impl PodResourcesProvider for SysInfoFallback {
    async fn list(&self, request: ListPodResourcesRequest) -> Result<ListPodResourcesResponse> {
        self.inner.list(request).await
    }

    async fn get_allocatable_resources(
        &self,
        request: AllocatableResourcesRequest,
    ) -> Result<AllocatableResourcesResponse> {
        let primary_err = match self.inner.get_allocatable_resources(request).await {
            Ok(resp) => return Ok(resp),
            Err(e) => e,
        };

        warn!(
            "{} GetAllocatableResources() failed with {} - using sysinfo",
            self.inner.provider_name(),
            primary_err
        );

        match self.allocatable_from_sysinfo().await {
            Ok(resp) => {
                info!(
                    "Serving allocatable resources from sysinfo: {} cpus, {} device groups",
                    resp.cpu_ids.len(),
                    resp.devices.len()
                );
                Ok(resp)
            }
            Err(sys_err) => {
                warn!("sysinfo fallback failed with {}", sys_err);
                Err(primary_err)
            }
        }
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}

/// Reshape an inventory into the allocatable response
///
/// Every (resource, NUMA node) pair becomes its own device group whose
/// topology names that node alone; a resource present on two nodes yields two
/// groups.
pub fn allocatable_response_from_sysinfo(sysinfo: &SysInfo) -> AllocatableResourcesResponse {
    let devices = sysinfo
        .resources
        .iter()
        .flat_map(|(resource_name, per_numa)| {
            per_numa.iter().map(move |(node, device_ids)| ContainerDevices {
                resource_name: resource_name.clone(),
                device_ids: device_ids.clone(),
                topology: Some(TopologyInfo::single(node.topology_id())),
            })
        })
        .collect();

    AllocatableResourcesResponse {
        devices,
        cpu_ids: sysinfo.cpus.to_api_ids(),
    }
}
