//! Hardware Module
//!
//! Provides CPU set handling, host discovery and the combined system
//! inventory of the node.

pub mod cpuset;
pub mod discovery;
pub mod sysinfo;

pub use cpuset::CpuSet;
pub use discovery::*;
pub use sysinfo::*;
