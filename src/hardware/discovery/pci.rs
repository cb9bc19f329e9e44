//! PCI Device Resources
//!
//! Maps PCI devices to logical resource names through the configured identity
//! map and groups their addresses by NUMA node.

use crate::domain::ports::{NumaNode, PciDevice, ResourceIdentityMap, ResourceMap};
use crate::error::Result;
use tracing::debug;

/// Resource name for a device
///
/// An exact `"vendor:product"` key wins over a `"vendor"` key. Devices matching
/// neither carry no resource.
pub fn resource_name_for_device<'a>(
    device: &PciDevice,
    identity_map: &'a ResourceIdentityMap,
) -> Option<&'a str> {
    let device_id = format!("{}:{}", device.vendor_id, device.product_id);
    if let Some(name) = identity_map.get(&device_id) {
        debug!("devs: resource for {} is {:?}", device_id, name);
        return Some(name);
    }
    if let Some(name) = identity_map.get(&device.vendor_id) {
        debug!("devs: resource for {} is {:?}", device.vendor_id, name);
        return Some(name);
    }
    None
}

/// Group the addresses of every mapped device by resource name and NUMA node
///
/// Devices keep their enumeration order. No matching device yields an empty map.
pub fn pci_resources<F>(identity_map: &ResourceIdentityMap, devices: F) -> Result<ResourceMap>
where
    F: FnOnce() -> Result<Vec<PciDevice>>,
{
    let mut resources = ResourceMap::new();

    for device in devices()? {
        let Some(name) = resource_name_for_device(&device, identity_map) else {
            continue;
        };

        resources
            .entry(name.to_string())
            .or_default()
            .entry(NumaNode::from(device.numa_node))
            .or_default()
            .push(device.address);
    }

    Ok(resources)
}
