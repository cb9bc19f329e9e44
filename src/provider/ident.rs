//! Reference Container Identity
//!
//! Identifies the container whose CPU assignment reveals the kubelet's shared
//! CPU pool (see kubernetes/kubernetes#102190).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environment variable holding the reference namespace
pub const ENV_NAMESPACE: &str = "REFERENCE_NAMESPACE";
/// Environment variable holding the reference pod name
pub const ENV_POD_NAME: &str = "REFERENCE_POD_NAME";
/// Environment variable holding the reference container name
pub const ENV_CONTAINER_NAME: &str = "REFERENCE_CONTAINER_NAME";

/// A container addressed by namespace, pod and container name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContainerIdent {
    pub namespace: String,
    pub pod_name: String,
    pub container_name: String,
}

impl ContainerIdent {
    pub fn new(
        namespace: impl Into<String>,
        pod_name: impl Into<String>,
        container_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pod_name: pod_name.into(),
            container_name: container_name.into(),
        }
    }

    /// Check whether a pod/container pair is this container
    pub fn matches(&self, namespace: &str, pod_name: &str, container_name: &str) -> bool {
        self.namespace == namespace
            && self.pod_name == pod_name
            && self.container_name == container_name
    }

    /// Read the identity from the `REFERENCE_*` environment variables
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the identity from a variable lookup
    ///
    /// All three unset or empty means no reference container; a partial set is
    /// an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        match (get(ENV_NAMESPACE), get(ENV_POD_NAME), get(ENV_CONTAINER_NAME)) {
            (None, None, None) => Ok(None),
            (Some(namespace), Some(pod_name), Some(container_name)) => {
                Ok(Some(Self::new(namespace, pod_name, container_name)))
            }
            _ => Err(Error::InvalidContainerIdent(format!(
                "{}, {} and {} must be set together",
                ENV_NAMESPACE, ENV_POD_NAME, ENV_CONTAINER_NAME
            ))),
        }
    }

    /// Pick the reference container: command line first, then the
    /// configuration file, then the environment
    pub fn resolve(flag: Option<&str>, configured: Option<ContainerIdent>) -> Result<Option<Self>> {
        if let Some(raw) = flag.map(str::trim).filter(|s| !s.is_empty()) {
            return raw.parse().map(Some);
        }
        if configured.is_some() {
            return Ok(configured);
        }
        Self::from_env()
    }
}

impl FromStr for ContainerIdent {
    type Err = Error;

    /// Parse `namespace/pod/container`
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        match parts.as_slice() {
            [namespace, pod_name, container_name]
                if parts.iter().all(|part| !part.is_empty()) =>
            {
                Ok(Self::new(*namespace, *pod_name, *container_name))
            }
            _ => Err(Error::InvalidContainerIdent(format!(
                "{:?} is not in the form namespace/podname/containername",
                s
            ))),
        }
    }
}

impl TryFrom<String> for ContainerIdent {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ContainerIdent> for String {
    fn from(ident: ContainerIdent) -> Self {
        ident.to_string()
    }
}

impl fmt::Display for ContainerIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.pod_name, self.container_name)
    }
}
