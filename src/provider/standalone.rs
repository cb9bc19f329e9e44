//! Standalone Providers
//!
//! Primary providers for nodes where the kubelet socket is not reachable by
//! this process.

use crate::domain::podresources::{
    AllocatableResourcesRequest, AllocatableResourcesResponse, ListPodResourcesRequest,
    ListPodResourcesResponse,
};
use crate::domain::ports::PodResourcesProvider;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

// =============================================================================
// Unavailable Provider
// =============================================================================

/// Provider whose every call fails
///
/// Wrapped in the sysinfo fallback, allocatable capacity then always comes
/// from the host while listings report the failure.
#[derive(Debug, Default)]
pub struct UnavailableProvider;

const UNAVAILABLE: &str = "unavailable";

#[async_trait]
impl PodResourcesProvider for UnavailableProvider {
    async fn list(&self, _request: ListPodResourcesRequest) -> Result<ListPodResourcesResponse> {
        Err(Error::upstream(UNAVAILABLE, "no pod resources endpoint configured"))
    }

    async fn get_allocatable_resources(
        &self,
        _request: AllocatableResourcesRequest,
    ) -> Result<AllocatableResourcesResponse> {
        Err(Error::upstream(UNAVAILABLE, "no pod resources endpoint configured"))
    }

    fn provider_name(&self) -> &str {
        UNAVAILABLE
    }
}

// =============================================================================
// Snapshot Provider
// =============================================================================

/// On-disk snapshot of both pod resources answers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodResourcesSnapshot {
    #[serde(flatten)]
    pub list: ListPodResourcesResponse,

    /// Absent when the kubelet does not expose allocatable resources
    #[serde(default)]
    pub allocatable: Option<AllocatableResourcesResponse>,
}

/// Provider serving a JSON snapshot file, re-read on every call
pub struct SnapshotProvider {
    path: PathBuf,
}

const SNAPSHOT: &str = "snapshot";

impl SnapshotProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_snapshot(&self) -> Result<PodResourcesSnapshot> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::upstream(SNAPSHOT, format!("{}: {}", self.path.display(), e)))?;

        let snapshot: PodResourcesSnapshot = serde_json::from_str(&data)
            .map_err(|e| Error::upstream(SNAPSHOT, format!("{}: {}", self.path.display(), e)))?;

        debug!(
            "Read snapshot {}: {} pods, allocatable {}",
            self.path.display(),
            snapshot.list.pod_resources.len(),
            snapshot.allocatable.is_some()
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl PodResourcesProvider for SnapshotProvider {
    async fn list(&self, _request: ListPodResourcesRequest) -> Result<ListPodResourcesResponse> {
        Ok(self.read_snapshot().await?.list)
    }

    async fn get_allocatable_resources(
        &self,
        _request: AllocatableResourcesRequest,
    ) -> Result<AllocatableResourcesResponse> {
        self.read_snapshot()
            .await?
            .allocatable
            .ok_or_else(|| Error::upstream(SNAPSHOT, "snapshot has no allocatable resources"))
    }

    fn provider_name(&self) -> &str {
        SNAPSHOT
    }
}
