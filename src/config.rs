//! Configuration
//!
//! Resource mapping and exporter configuration files. Both are optional: a
//! missing file yields the defaults. Files are parsed as YAML, which also
//! accepts the JSON form of `resources.json`.

use crate::domain::ports::ResourceIdentityMap;
use crate::error::{Error, Result};
use crate::provider::ident::ContainerIdent;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

// =============================================================================
// Resources Configuration
// =============================================================================

/// Inputs of the host inventory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcesConfig {
    /// CPUs withheld from workloads, as a cpu-list (e.g., "0,8")
    #[serde(default)]
    pub reserved_cpus: String,

    /// "vendor:product" or "vendor" -> resource name
    #[serde(default)]
    pub resource_mapping: ResourceIdentityMap,
}

/// Default location of the resources configuration
pub const DEFAULT_RESOURCES_CONFIG_PATH: &str =
    "/etc/resource-topology-exporter-config/resources.json";

impl ResourcesConfig {
    /// Load from a JSON or YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_optional(path.as_ref())
    }

    /// Load the resources file, falling back to the `resources` section of
    /// the exporter configuration when the file is missing or empty
    pub fn resolve(path: impl AsRef<Path>, exporter: &ExporterConfig) -> Result<Self> {
        let config = Self::load(path)?;
        if config == Self::default() {
            return Ok(exporter.resources.clone());
        }
        Ok(config)
    }
}

// =============================================================================
// Exporter Configuration
// =============================================================================

/// Exporter-wide configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExporterConfig {
    /// Host inventory inputs
    #[serde(default)]
    pub resources: ResourcesConfig,

    /// Container whose CPUs reveal the shared pool ("namespace/pod/container")
    #[serde(default)]
    pub reference_container: Option<ContainerIdent>,
}

impl ExporterConfig {
    /// Load from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_optional(path.as_ref())
    }
}

fn load_optional<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("conf: couldn't find configuration in {:?}", path);
            return Ok(T::default());
        }
        Err(e) => {
            return Err(Error::Configuration(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    if data.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_yaml::from_str(&data)?)
}
