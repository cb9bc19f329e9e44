//! Provider Events
//!
//! Events emitted by the provider chain for observability.

use crate::hardware::cpuset::CpuSet;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Events emitted by the shared-pool filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FilterEvent {
    /// The CPUs seen on the reference container changed
    SharedPoolChanged {
        previous: CpuSet,
        current: CpuSet,
        observed_at: DateTime<Utc>,
    },
}

impl FilterEvent {
    /// Get a short event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            FilterEvent::SharedPoolChanged { .. } => "shared_pool_changed",
        }
    }
}
