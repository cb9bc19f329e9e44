//! Hardware Discovery Module
//!
//! Discovers the allocatable CPUs, PCI devices and hugepage pools of the
//! node and shapes them into per-NUMA resource maps.

pub mod cpu;
pub mod hugepages;
pub mod pci;
pub mod sysfs;

pub use cpu::*;
pub use hugepages::*;
pub use pci::*;
pub use sysfs::*;
