//! Domain layer - Core types and port definitions
//!
//! This module defines the core traits (ports) that adapters implement,
//! following hexagonal architecture principles.

pub mod podresources;
pub mod ports;

pub use podresources::*;
pub use ports::*;
