//! Pod Resources Provider Chain
//!
//! Decorators layered over a primary pod-resources provider:
//! - Sysinfo fallback for allocatable capacity
//! - Shared-pool filtering of per-container CPU assignments

pub mod events;
pub mod fallback;
pub mod filter;
pub mod ident;
pub mod standalone;

pub use events::FilterEvent;
pub use fallback::{allocatable_response_from_sysinfo, SysInfoFallback};
pub use filter::SharedPoolFilter;
pub use ident::ContainerIdent;
pub use standalone::{PodResourcesSnapshot, SnapshotProvider, UnavailableProvider};

use crate::config::ResourcesConfig;
use crate::domain::ports::{HostProbeRef, PodResourcesProvider, PodResourcesProviderRef};
use std::sync::Arc;
use tracing::info;

/// Assembled provider chain
///
/// The outermost element is always the shared-pool filter, kept concretely
/// typed so callers can follow its state and events.
pub struct ProviderChain {
    filter: Arc<SharedPoolFilter>,
}

impl ProviderChain {
    /// Wrap `primary` in the sysinfo fallback when a resources configuration
    /// is given, then in the shared-pool filter
    pub fn build(
        primary: PodResourcesProviderRef,
        sysinfo: Option<(ResourcesConfig, HostProbeRef)>,
        reference: Option<ContainerIdent>,
    ) -> Self {
        let inner: PodResourcesProviderRef = match sysinfo {
            Some((config, probe)) => {
                info!("Using sysinfo fallback for {}", primary.provider_name());
                Arc::new(SysInfoFallback::new(primary, config, probe))
            }
            None => primary,
        };

        let filter = Arc::new(SharedPoolFilter::new(inner, reference));
        info!("Provider chain: {}", filter.provider_name());

        Self { filter }
    }

    /// The chain as a provider
    pub fn provider(&self) -> PodResourcesProviderRef {
        self.filter.clone()
    }

    /// The shared-pool filter at the head of the chain
    pub fn filter(&self) -> &Arc<SharedPoolFilter> {
        &self.filter
    }
}
