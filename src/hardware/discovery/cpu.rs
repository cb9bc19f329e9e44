//! CPU Inventory
//!
//! Derives the allocatable CPU set from the online CPUs and the
//! operator-reserved CPUs.

use crate::error::Result;
use crate::hardware::cpuset::CpuSet;
use tracing::debug;

/// Online CPUs minus the reserved cpu-list `reserved`
///
/// The reserved list is parsed before the host is read, so a malformed
/// configuration fails without touching sysfs. Errors from `online` are
/// returned as-is.
pub fn allocatable_cpus<F>(reserved: &str, online: F) -> Result<CpuSet>
where
    F: FnOnce() -> Result<CpuSet>,
{
    let reserved_cpus = CpuSet::parse(reserved)?;
    debug!("cpus: reserved {:?}", reserved_cpus.to_string());

    let online_cpus = online()?;
    debug!("cpus: online {:?}", online_cpus.to_string());

    Ok(online_cpus.difference(&reserved_cpus))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use assert_matches::assert_matches;

    fn online(list: &'static str) -> impl FnOnce() -> Result<CpuSet> {
        move || CpuSet::parse(list)
    }

    #[test]
    fn test_no_reserved() {
        let cpus = allocatable_cpus("", online("0-15")).unwrap();
        assert_eq!(cpus, CpuSet::parse("0-15").unwrap());
    }

    #[test]
    fn test_reserved() {
        let cpus = allocatable_cpus("0,8", online("0-15")).unwrap();
        assert_eq!(cpus.to_string(), "1-7,9-15");
        assert_eq!(cpus.len(), 14);
    }

    #[test]
    fn test_result_never_intersects_reserved() {
        let reserved = CpuSet::parse("0-3,12").unwrap();
        let cpus = allocatable_cpus("0-3,12", online("0-15")).unwrap();
        assert!(cpus.intersection(&reserved).is_empty());
        assert_eq!(cpus.len(), 16 - reserved.len());
    }

    #[test]
    fn test_reserved_outside_online() {
        let cpus = allocatable_cpus("32-35", online("0-3")).unwrap();
        assert_eq!(cpus.to_string(), "0-3");
    }

    #[test]
    fn test_malformed_reserved_skips_probe() {
        let result = allocatable_cpus("0-", || -> Result<CpuSet> {
            panic!("host must not be read on a configuration error")
        });
        assert_matches!(result, Err(Error::CpuListParse { .. }));
    }

    #[test]
    fn test_probe_error_propagates() {
        let result = allocatable_cpus("0", || Err(Error::HostProbe("no sysfs".into())));
        assert_matches!(result, Err(Error::HostProbe(msg)) if msg == "no sysfs");
    }
}
