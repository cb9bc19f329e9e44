//! System Inventory
//!
//! Combines the CPU, PCI and hugepage inventories of the node into one
//! snapshot. A snapshot is built fresh on every request because hugepage
//! counts and PCI devices can change between polls.

use crate::config::ResourcesConfig;
use crate::domain::ports::{HostProbe, ResourceMap};
use crate::error::{Error, Result};
use crate::hardware::cpuset::CpuSet;
use crate::hardware::discovery::{allocatable_cpus, hugepage_resources, pci_resources};
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Allocatable inventory of the node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SysInfo {
    /// Online CPUs minus the reserved ones
    pub cpus: CpuSet,
    /// Resource name -> NUMA node -> device ids
    pub resources: ResourceMap,
}

impl SysInfo {
    /// Probe the host and build the inventory
    ///
    /// Fails with [`Error::NoAllocatableCpus`] when reservation leaves no CPU,
    /// since such a node cannot stand in for the kubelet's view.
    pub fn build(config: &ResourcesConfig, probe: &dyn HostProbe) -> Result<Self> {
        let cpus = allocatable_cpus(&config.reserved_cpus, || probe.online_cpus())?;
        if cpus.is_empty() {
            return Err(Error::NoAllocatableCpus {
                reserved: config.reserved_cpus.clone(),
            });
        }

        let mut resources = pci_resources(&config.resource_mapping, || probe.pci_devices())?;
        merge_resources(&mut resources, hugepage_resources(|| probe.hugepages())?);

        debug!(
            "sysinfo: {} allocatable cpus, {} resources",
            cpus.len(),
            resources.len()
        );
        Ok(Self { cpus, resources })
    }
}

/// Merge `src` into `dst`, replacing whole entries on a name collision
pub fn merge_resources(dst: &mut ResourceMap, src: ResourceMap) {
    dst.extend(src);
}

impl fmt::Display for SysInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cpus: allocatable {:?}", self.cpus.to_string())?;
        for (name, per_numa) in &self.resources {
            writeln!(f, "resource {:?}:", name)?;
            for (node, devices) in per_numa {
                writeln!(f, "  numa cell {} -> {:?}", node, devices)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{HugepagePool, NumaNode, PciDevice, PerNumaDevices};
    use crate::error::ErrorKind;
    use assert_matches::assert_matches;

    struct FakeProbe {
        online: &'static str,
        devices: Vec<PciDevice>,
        hugepages: Vec<HugepagePool>,
    }

    impl HostProbe for FakeProbe {
        fn online_cpus(&self) -> Result<CpuSet> {
            CpuSet::parse(self.online)
        }

        fn pci_devices(&self) -> Result<Vec<PciDevice>> {
            Ok(self.devices.clone())
        }

        fn hugepages(&self) -> Result<Vec<HugepagePool>> {
            Ok(self.hugepages.clone())
        }
    }

    struct BrokenPciProbe;

    impl HostProbe for BrokenPciProbe {
        fn online_cpus(&self) -> Result<CpuSet> {
            CpuSet::parse("0-3")
        }

        fn pci_devices(&self) -> Result<Vec<PciDevice>> {
            Err(Error::HostProbe("cannot list pci devices".into()))
        }

        fn hugepages(&self) -> Result<Vec<HugepagePool>> {
            Ok(Vec::new())
        }
    }

    fn nic(address: &str, numa_node: Option<u32>) -> PciDevice {
        PciDevice {
            address: address.into(),
            vendor_id: "8086".into(),
            product_id: "1520".into(),
            numa_node,
        }
    }

    fn config(reserved: &str) -> ResourcesConfig {
        ResourcesConfig {
            reserved_cpus: reserved.into(),
            resource_mapping: [("8086:1520".to_string(), "intel_nics".to_string())]
                .into_iter()
                .collect(),
        }
    }

    fn devices(entries: &[(NumaNode, &str)]) -> PerNumaDevices {
        entries
            .iter()
            .map(|(node, dev)| (*node, vec![dev.to_string()]))
            .collect()
    }

    #[test]
    fn test_build() {
        let probe = FakeProbe {
            online: "0-7",
            devices: vec![nic("0000:00:02.0", Some(0)), nic("0000:00:03.0", Some(1))],
            hugepages: vec![
                HugepagePool {
                    node_id: 0,
                    size_kb: 2048,
                    total: 64,
                },
                HugepagePool {
                    node_id: 1,
                    size_kb: 2048,
                    total: 0,
                },
            ],
        };

        let sysinfo = SysInfo::build(&config("0,4"), &probe).unwrap();

        assert_eq!(sysinfo.cpus.to_string(), "1-3,5-7");
        assert_eq!(sysinfo.resources.len(), 2);
        assert_eq!(
            sysinfo.resources["intel_nics"],
            devices(&[
                (NumaNode::Node(0), "0000:00:02.0"),
                (NumaNode::Node(1), "0000:00:03.0"),
            ])
        );
        assert_eq!(
            sysinfo.resources["hugepages-2048kB"],
            devices(&[(NumaNode::Node(0), "64")])
        );
    }

    #[test]
    fn test_build_without_allocatable_cpus() {
        let probe = FakeProbe {
            online: "0-3",
            devices: Vec::new(),
            hugepages: Vec::new(),
        };

        let err = SysInfo::build(&config("0-3"), &probe).unwrap_err();
        assert_matches!(err, Error::NoAllocatableCpus { ref reserved } if reserved == "0-3");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_build_pci_failure_aborts() {
        let err = SysInfo::build(&config(""), &BrokenPciProbe).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HostProbe);
    }

    #[test]
    fn test_merge_overwrites_whole_entry() {
        let mut a: ResourceMap = [("x".to_string(), devices(&[(NumaNode::Node(0), "a")]))]
            .into_iter()
            .collect();
        let b: ResourceMap = [("x".to_string(), devices(&[(NumaNode::Node(1), "b")]))]
            .into_iter()
            .collect();

        merge_resources(&mut a, b);

        assert_eq!(a.len(), 1);
        assert_eq!(a["x"], devices(&[(NumaNode::Node(1), "b")]));
    }

    #[test]
    fn test_hugepages_win_name_collision() {
        let probe = FakeProbe {
            online: "0-3",
            devices: vec![nic("0000:00:02.0", Some(0))],
            hugepages: vec![HugepagePool {
                node_id: 1,
                size_kb: 2048,
                total: 8,
            }],
        };
        let mut config = config("");
        config
            .resource_mapping
            .insert("8086:1520".into(), "hugepages-2048kB".into());

        let sysinfo = SysInfo::build(&config, &probe).unwrap();
        assert_eq!(
            sysinfo.resources["hugepages-2048kB"],
            devices(&[(NumaNode::Node(1), "8")])
        );
    }

    #[test]
    fn test_display() {
        let sysinfo = SysInfo {
            cpus: CpuSet::parse("1-3").unwrap(),
            resources: [(
                "intel_nics".to_string(),
                devices(&[(NumaNode::Unknown, "0000:00:02.0")]),
            )]
            .into_iter()
            .collect(),
        };

        let rendered = sysinfo.to_string();
        assert!(rendered.contains("cpus: allocatable \"1-3\""));
        assert!(rendered.contains("resource \"intel_nics\":"));
        assert!(rendered.contains("numa cell unknown -> [\"0000:00:02.0\"]"));
    }

    #[test]
    fn test_serialize() {
        let sysinfo = SysInfo {
            cpus: CpuSet::parse("1-3").unwrap(),
            resources: [(
                "intel_nics".to_string(),
                devices(&[(NumaNode::Node(1), "0000:00:02.0")]),
            )]
            .into_iter()
            .collect(),
        };

        let value = serde_json::to_value(&sysinfo).unwrap();
        assert_eq!(value["cpus"], "1-3");
        assert_eq!(value["resources"]["intel_nics"]["1"][0], "0000:00:02.0");
    }
}
