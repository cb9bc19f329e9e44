//! Shared-Pool Filter
//!
//! The kubelet reports the shared pool as if it were exclusively assigned to
//! every container running in it (kubernetes/kubernetes#102190). A reference
//! container that only ever runs in the shared pool reveals which CPUs those
//! are, so they can be removed from every container's assignment.

use crate::domain::podresources::{
    AllocatableResourcesRequest, AllocatableResourcesResponse, ListPodResourcesRequest,
    ListPodResourcesResponse,
};
use crate::domain::ports::{PodResourcesProvider, PodResourcesProviderRef};
use crate::error::Result;
use crate::hardware::cpuset::CpuSet;
use crate::provider::events::FilterEvent;
use crate::provider::ident::ContainerIdent;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Capacity of the filter event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct FilterState {
    previous_shared_pool: CpuSet,
    transitions: u64,
}

/// Decorator removing the shared CPU pool from per-container assignments
pub struct SharedPoolFilter {
    inner: PodResourcesProviderRef,
    reference: Option<ContainerIdent>,
    state: Mutex<FilterState>,
    event_tx: broadcast::Sender<FilterEvent>,
    name: String,
}

impl SharedPoolFilter {
    pub fn new(inner: PodResourcesProviderRef, reference: Option<ContainerIdent>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let name = format!("filtering({})", inner.provider_name());

        match &reference {
            Some(ident) => info!("Shared pool reference container: {}", ident),
            None => info!("No shared pool reference container, cpu ids pass through"),
        }

        Self {
            inner,
            reference,
            state: Mutex::new(FilterState::default()),
            event_tx,
            name,
        }
    }

    /// Shared pool observed on the last `list`
    pub fn shared_pool(&self) -> CpuSet {
        self.state.lock().previous_shared_pool.clone()
    }

    /// Number of shared pool changes observed so far
    pub fn transitions(&self) -> u64 {
        self.state.lock().transitions
    }

    /// Get an event receiver
    pub fn subscribe(&self) -> broadcast::Receiver<FilterEvent> {
        self.event_tx.subscribe()
    }

    fn emit_event(&self, event: FilterEvent) {
        let _ = self.event_tx.send(event);
    }

    /// CPUs of the first container matching the reference identity
    fn find_shared_pool(&self, resp: &ListPodResourcesResponse) -> CpuSet {
        let Some(reference) = &self.reference else {
            return CpuSet::new();
        };

        resp.pod_resources
            .iter()
            .flat_map(|pod| {
                pod.containers
                    .iter()
                    .map(move |cnt| (pod.namespace.as_str(), pod.name.as_str(), cnt))
            })
            .find(|(namespace, pod_name, cnt)| reference.matches(namespace, pod_name, &cnt.name))
            .map(|(_, _, cnt)| CpuSet::from_api_ids(&cnt.cpu_ids))
            .unwrap_or_default()
    }

    fn record_shared_pool(&self, current: &CpuSet) {
        let mut state = self.state.lock();
        if state.previous_shared_pool == *current {
            return;
        }

        info!(
            "detected shared pool change: {:?} -> {:?}",
            state.previous_shared_pool.to_string(),
            current.to_string()
        );
        let previous = std::mem::replace(&mut state.previous_shared_pool, current.clone());
        state.transitions += 1;

        self.emit_event(FilterEvent::SharedPoolChanged {
            previous,
            current: current.clone(),
            observed_at: Utc::now(),
        });
    }
}

/// Replace every container's cpu ids with their set difference to `pool`
///
/// An empty pool leaves the response untouched.
fn remove_shared_pool(resp: &mut ListPodResourcesResponse, pool: &CpuSet) {
    if pool.is_empty() {
        return;
    }

    for pod in &mut resp.pod_resources {
        for cnt in &mut pod.containers {
            let exclusive = CpuSet::from_api_ids(&cnt.cpu_ids).difference(pool).to_api_ids();
            if exclusive != cnt.cpu_ids {
                debug!(
                    "container {}/{}/{}: cpus {:?} -> {:?}",
                    pod.namespace,
                    pod.name,
                    cnt.name,
                    cnt.cpu_ids,
                    exclusive
                );
                cnt.cpu_ids = exclusive;
            }
        }
    }
}

#[async_trait]
impl PodResourcesProvider for SharedPoolFilter {
    async fn list(&self, request: ListPodResourcesRequest) -> Result<ListPodResourcesResponse> {
        let mut resp = self.inner.list(request).await?;

        let shared_pool = self.find_shared_pool(&resp);
        self.record_shared_pool(&shared_pool);
        remove_shared_pool(&mut resp, &shared_pool);

        Ok(resp)
    }

    async fn get_allocatable_resources(
        &self,
        request: AllocatableResourcesRequest,
    ) -> Result<AllocatableResourcesResponse> {
        self.inner.get_allocatable_resources(request).await
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
