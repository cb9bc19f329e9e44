//! Hugepage Resources
//!
//! Turns per-NUMA hugepage pools into resources named `hugepages-<size>kB`.
//! The single "device id" recorded under a node is the page count, not an
//! address; consumers must not treat it as a real device.

use crate::domain::ports::{HugepagePool, NumaNode, ResourceMap};
use crate::error::Result;

/// Resource name of a hugepage size
pub fn hugepage_resource_name(size_kb: u64) -> String {
    format!("hugepages-{}kB", size_kb)
}

/// Parse a sysfs size directory name such as `hugepages-2048kB`
pub fn parse_hugepage_dir_name(name: &str) -> Option<u64> {
    name.strip_prefix("hugepages-")?
        .strip_suffix("kB")?
        .parse()
        .ok()
}

/// Aggregate hugepage pools into a resource map
///
/// Pools sized to zero carry no resource and are skipped.
pub fn hugepage_resources<F>(pools: F) -> Result<ResourceMap>
where
    F: FnOnce() -> Result<Vec<HugepagePool>>,
{
    let mut resources = ResourceMap::new();

    for pool in pools()? {
        if pool.total == 0 {
            continue;
        }

        resources
            .entry(hugepage_resource_name(pool.size_kb))
            .or_default()
            .insert(NumaNode::Node(pool.node_id), vec![pool.total.to_string()]);
    }

    Ok(resources)
}
