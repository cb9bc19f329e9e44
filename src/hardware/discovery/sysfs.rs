//! Sysfs Host Probe
//!
//! Reads online CPUs, PCI devices and per-NUMA hugepage pools from a sysfs
//! tree. The root is configurable so the probe can run against a host sysfs
//! mounted inside a container, or against a fixture in tests.

use crate::domain::ports::{HostProbe, HugepagePool, NumaNode, PciDevice};
use crate::error::{Error, Result};
use crate::hardware::cpuset::CpuSet;
use crate::hardware::discovery::hugepages::parse_hugepage_dir_name;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// =============================================================================
// Constants
// =============================================================================

const ONLINE_CPUS: &str = "devices/system/cpu/online";
const NODES: &str = "devices/system/node";
const PCI_DEVICES: &str = "bus/pci/devices";

// =============================================================================
// Probe Configuration
// =============================================================================

/// Configuration for the sysfs probe
#[derive(Debug, Clone)]
pub struct SysfsConfig {
    /// Path to sysfs (for containers and testing)
    pub sysfs_path: PathBuf,
}

impl Default for SysfsConfig {
    fn default() -> Self {
        Self {
            sysfs_path: PathBuf::from("/sys"),
        }
    }
}

// =============================================================================
// Sysfs Probe
// =============================================================================

/// Reads the host inventory from sysfs
#[derive(Debug, Clone)]
pub struct SysfsProbe {
    config: SysfsConfig,
}

impl SysfsProbe {
    /// Create a new probe
    pub fn new(config: SysfsConfig) -> Self {
        Self { config }
    }

    /// Create a probe rooted at `path`
    pub fn with_root(path: impl Into<PathBuf>) -> Self {
        Self::new(SysfsConfig {
            sysfs_path: path.into(),
        })
    }

    /// Sysfs root this probe reads from
    pub fn root(&self) -> &Path {
        &self.config.sysfs_path
    }

    /// Hugepage pools of one node directory
    fn node_hugepages(&self, node_id: u32, node_path: &Path) -> Result<Vec<HugepagePool>> {
        let hugepages_path = node_path.join("hugepages");
        let entries = fs::read_dir(&hugepages_path).map_err(|e| Error::LeafProbe {
            path: hugepages_path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut pools = Vec::new();
        for entry in readable_entries(&hugepages_path, entries) {
            let name = entry.file_name().to_string_lossy().to_string();
            let Some(size_kb) = parse_hugepage_dir_name(&name) else {
                debug!("Ignoring unexpected hugepage entry {:?}", entry.path());
                continue;
            };

            match self.read_sysfs_u64(&entry.path(), "nr_hugepages") {
                Ok(total) => pools.push(HugepagePool {
                    node_id,
                    size_kb,
                    total,
                }),
                Err(e) => warn!("Skipping hugepages-{}kB on node {}: {}", size_kb, node_id, e),
            }
        }

        Ok(pools)
    }

    /// Read one PCI device directory
    fn scan_pci_device(&self, device_path: &Path) -> Result<PciDevice> {
        let address = device_path
            .file_name()
            .ok_or_else(|| Error::HostProbe("Invalid sysfs path".into()))?
            .to_string_lossy()
            .to_string();

        let vendor_id = normalize_pci_id(&self.read_sysfs_attr(device_path, "vendor")?);
        let product_id = normalize_pci_id(&self.read_sysfs_attr(device_path, "device")?);

        // Missing on platforms without NUMA; -1 when the firmware reports none
        let numa_node = self
            .read_sysfs_attr(device_path, "numa_node")
            .ok()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(|raw| NumaNode::from_raw(raw).id());

        Ok(PciDevice {
            address,
            vendor_id,
            product_id,
            numa_node,
        })
    }

    /// Read a sysfs attribute
    fn read_sysfs_attr(&self, base_path: &Path, attr: &str) -> Result<String> {
        let path = base_path.join(attr);
        fs::read_to_string(&path).map_err(|e| Error::LeafProbe {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Read a sysfs attribute holding one unsigned integer
    fn read_sysfs_u64(&self, base_path: &Path, attr: &str) -> Result<u64> {
        let raw = self.read_sysfs_attr(base_path, attr)?;
        raw.trim().parse().map_err(|e| Error::LeafProbe {
            path: base_path.join(attr).display().to_string(),
            reason: format!("invalid value {:?}: {}", raw.trim(), e),
        })
    }
}

impl Default for SysfsProbe {
    fn default() -> Self {
        Self::new(SysfsConfig::default())
    }
}

impl HostProbe for SysfsProbe {
    fn online_cpus(&self) -> Result<CpuSet> {
        let path = self.config.sysfs_path.join(ONLINE_CPUS);
        let data = fs::read_to_string(&path).map_err(|e| {
            Error::HostProbe(format!("Failed to read {}: {}", path.display(), e))
        })?;
        CpuSet::parse(data.trim()).map_err(|e| {
            Error::HostProbe(format!("Invalid contents of {}: {}", path.display(), e))
        })
    }

    fn pci_devices(&self) -> Result<Vec<PciDevice>> {
        let pci_path = self.config.sysfs_path.join(PCI_DEVICES);
        let entries = fs::read_dir(&pci_path).map_err(|e| {
            Error::HostProbe(format!("Failed to list {}: {}", pci_path.display(), e))
        })?;

        let mut devices = Vec::new();
        for entry in readable_entries(&pci_path, entries) {
            match self.scan_pci_device(&entry.path()) {
                Ok(device) => devices.push(device),
                Err(e) => warn!("Skipping PCI device {:?}: {}", entry.file_name(), e),
            }
        }

        // Directory order is unspecified; keep the inventory stable across polls
        devices.sort_by(|a, b| a.address.cmp(&b.address));
        debug!("Found {} PCI devices", devices.len());
        Ok(devices)
    }

    fn hugepages(&self) -> Result<Vec<HugepagePool>> {
        let nodes_path = self.config.sysfs_path.join(NODES);
        let entries = fs::read_dir(&nodes_path).map_err(|e| {
            Error::HostProbe(format!("Failed to list {}: {}", nodes_path.display(), e))
        })?;

        let mut nodes = Vec::new();
        for entry in readable_entries(&nodes_path, entries) {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            let Some(suffix) = name.strip_prefix("node") else {
                continue;
            };
            match suffix.parse::<u32>() {
                Ok(node_id) => nodes.push((node_id, entry.path())),
                Err(_) => warn!("Skipping unexpected node directory {:?}", name),
            }
        }
        nodes.sort_by_key(|(node_id, _)| *node_id);

        let mut pools = Vec::new();
        for (node_id, node_path) in nodes {
            match self.node_hugepages(node_id, &node_path) {
                Ok(mut node_pools) => {
                    node_pools.sort_by_key(|pool| pool.size_kb);
                    pools.extend(node_pools);
                }
                Err(e) => warn!("Skipping hugepages of node {}: {}", node_id, e),
            }
        }

        Ok(pools)
    }
}

/// Directory entries that could be read, warning about the others
fn readable_entries<'a, T: 'a>(
    dir: &'a Path,
    entries: impl Iterator<Item = io::Result<T>> + 'a,
) -> impl Iterator<Item = T> + 'a {
    entries.filter_map(move |entry| match entry {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!("Skipping unreadable entry of {}: {}", dir.display(), e);
            None
        }
    })
}

/// `0x8086\n` -> `8086`
fn normalize_pci_id(raw: &str) -> String {
    let id = raw.trim();
    id.strip_prefix("0x")
        .or_else(|| id.strip_prefix("0X"))
        .unwrap_or(id)
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn pci_device(root: &Path, address: &str, vendor: &str, device: &str, numa: Option<&str>) {
        let base = format!("bus/pci/devices/{}", address);
        write(root, &format!("{}/vendor", base), vendor);
        write(root, &format!("{}/device", base), device);
        if let Some(numa) = numa {
            write(root, &format!("{}/numa_node", base), numa);
        }
    }

    #[test]
    fn test_online_cpus() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), ONLINE_CPUS, "0-15\n");

        let probe = SysfsProbe::with_root(tmp.path());
        assert_eq!(probe.online_cpus().unwrap().to_string(), "0-15");
    }

    #[test]
    fn test_online_cpus_missing() {
        let tmp = TempDir::new().unwrap();
        let probe = SysfsProbe::with_root(tmp.path());
        assert_matches!(probe.online_cpus(), Err(Error::HostProbe(_)));
    }

    #[test]
    fn test_pci_devices() {
        let tmp = TempDir::new().unwrap();
        pci_device(tmp.path(), "0000:00:03.0", "0x8086\n", "0x1520\n", Some("1\n"));
        pci_device(tmp.path(), "0000:00:02.0", "0x8086\n", "0x1520\n", Some("-1\n"));
        pci_device(tmp.path(), "0000:00:1f.0", "0x15B3\n", "0x1017\n", None);

        let probe = SysfsProbe::with_root(tmp.path());
        let devices = probe.pci_devices().unwrap();

        assert_eq!(devices.len(), 3);
        assert_eq!(
            devices[0],
            PciDevice {
                address: "0000:00:02.0".into(),
                vendor_id: "8086".into(),
                product_id: "1520".into(),
                numa_node: None,
            }
        );
        assert_eq!(devices[1].numa_node, Some(1));
        assert_eq!(devices[2].vendor_id, "15b3");
        assert_eq!(devices[2].numa_node, None);
    }

    #[test]
    fn test_pci_device_without_vendor_skipped() {
        let tmp = TempDir::new().unwrap();
        pci_device(tmp.path(), "0000:00:02.0", "0x8086", "0x1520", Some("0"));
        write(tmp.path(), "bus/pci/devices/0000:00:04.0/device", "0x1520");

        let probe = SysfsProbe::with_root(tmp.path());
        let devices = probe.pci_devices().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].address, "0000:00:02.0");
    }

    #[test]
    fn test_pci_bus_missing() {
        let tmp = TempDir::new().unwrap();
        let probe = SysfsProbe::with_root(tmp.path());
        assert_matches!(probe.pci_devices(), Err(Error::HostProbe(_)));
    }

    #[test]
    fn test_hugepages() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(root, "devices/system/node/node0/hugepages/hugepages-2048kB/nr_hugepages", "512\n");
        write(root, "devices/system/node/node0/hugepages/hugepages-1048576kB/nr_hugepages", "0\n");
        write(root, "devices/system/node/node1/hugepages/hugepages-2048kB/nr_hugepages", "128\n");
        write(root, "devices/system/node/possible", "0-1\n");

        let probe = SysfsProbe::with_root(root);
        let pools = probe.hugepages().unwrap();

        assert_eq!(
            pools,
            vec![
                HugepagePool {
                    node_id: 0,
                    size_kb: 2048,
                    total: 512,
                },
                HugepagePool {
                    node_id: 0,
                    size_kb: 1048576,
                    total: 0,
                },
                HugepagePool {
                    node_id: 1,
                    size_kb: 2048,
                    total: 128,
                },
            ]
        );
    }

    #[test]
    fn test_hugepages_leaf_failures_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        // Unreadable count on one size
        write(root, "devices/system/node/node0/hugepages/hugepages-2048kB/nr_hugepages", "lots\n");
        write(root, "devices/system/node/node0/hugepages/hugepages-1048576kB/nr_hugepages", "2\n");
        // Unexpected size directory name
        write(root, "devices/system/node/node0/hugepages/hugepages-2MB/nr_hugepages", "8\n");
        // Node without hugepages directory
        fs::create_dir_all(root.join("devices/system/node/node1")).unwrap();
        // Unparsable node id
        write(root, "devices/system/node/nodeX/hugepages/hugepages-2048kB/nr_hugepages", "8\n");
        write(root, "devices/system/node/node2/hugepages/hugepages-2048kB/nr_hugepages", "16\n");

        let probe = SysfsProbe::with_root(root);
        let pools = probe.hugepages().unwrap();

        assert_eq!(
            pools,
            vec![
                HugepagePool {
                    node_id: 0,
                    size_kb: 1048576,
                    total: 2,
                },
                HugepagePool {
                    node_id: 2,
                    size_kb: 2048,
                    total: 16,
                },
            ]
        );
    }

    #[test]
    fn test_hugepages_node_listing_missing() {
        let tmp = TempDir::new().unwrap();
        let probe = SysfsProbe::with_root(tmp.path());
        assert_matches!(probe.hugepages(), Err(Error::HostProbe(_)));
    }

    #[test]
    fn test_unreadable_entries_skipped() {
        let dir = Path::new("/sys/devices/system/node");
        let entries = vec![
            Ok("node0"),
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            Ok("node1"),
        ];

        let readable: Vec<&str> = readable_entries(dir, entries.into_iter()).collect();
        assert_eq!(readable, vec!["node0", "node1"]);
    }

    #[test]
    fn test_sysfs_root() {
        assert_eq!(SysfsProbe::default().root(), Path::new("/sys"));
        assert_eq!(SysfsProbe::with_root("/host/sys").root(), Path::new("/host/sys"));
    }

    #[test]
    fn test_normalize_pci_id() {
        assert_eq!(normalize_pci_id("0x8086\n"), "8086");
        assert_eq!(normalize_pci_id("0X15B3"), "15b3");
        assert_eq!(normalize_pci_id("10de"), "10de");
    }
}
