//! Error types for the resource inventory
//!
//! Provides structured error types for the inventory builders, the host
//! probes and the pod-resources provider chain.

use thiserror::Error;

/// Unified error type for the inventory
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid cpu list {input:?}: {reason}")]
    CpuListParse { input: String, reason: String },

    #[error("No allocatable cpus left after reserving {reserved:?}")]
    NoAllocatableCpus { reserved: String },

    #[error("Invalid reference container: {0}")]
    InvalidContainerIdent(String),

    // =========================================================================
    // Host Probe Errors
    // =========================================================================
    #[error("Host probe failed: {0}")]
    HostProbe(String),

    #[error("Failed to probe {path}: {reason}")]
    LeafProbe { path: String, reason: String },

    // =========================================================================
    // Provider Errors
    // =========================================================================
    #[error("Pod resources provider {provider} failed: {reason}")]
    Upstream { provider: String, reason: String },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Broad classification of an [`Error`], used to decide how it propagates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unsatisfiable configuration
    Configuration,
    /// A host read surface could not be enumerated; aborts the inventory build
    HostProbe,
    /// A single leaf (one node, one page size, one device) could not be read
    LeafProbe,
    /// The primary pod-resources provider failed
    UpstreamProvider,
    /// Everything else
    Internal,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_)
            | Error::CpuListParse { .. }
            | Error::NoAllocatableCpus { .. }
            | Error::InvalidContainerIdent(_)
            | Error::YamlParse(_) => ErrorKind::Configuration,

            Error::HostProbe(_) => ErrorKind::HostProbe,

            Error::LeafProbe { .. } => ErrorKind::LeafProbe,

            Error::Upstream { .. } | Error::JsonParse(_) => ErrorKind::UpstreamProvider,

            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if retrying the failed call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::HostProbe | ErrorKind::LeafProbe | ErrorKind::UpstreamProvider
        )
    }

    /// Shorthand for a failed primary provider call
    pub fn upstream(provider: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::Upstream {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for the inventory
pub type Result<T> = std::result::Result<T, Error>;
