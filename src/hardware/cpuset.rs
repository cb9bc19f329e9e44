//! CPU Sets
//!
//! An ordered set of CPU ids with the Linux cpu-list text form
//! (`"0-3,8,10-12"`) used by sysfs and the kubelet.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// An immutable set of CPU ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CpuSet {
    cpus: BTreeSet<u32>,
}

impl CpuSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a cpu-list expression such as `"0-3,8"`
    ///
    /// Surrounding whitespace is ignored and the empty string is the empty
    /// set. Ranges must be ascending.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let mut cpus = BTreeSet::new();
        if trimmed.is_empty() {
            return Ok(Self { cpus });
        }

        for part in trimmed.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start = parse_cpu_id(input, start)?;
                let end = parse_cpu_id(input, end)?;
                if start > end {
                    return Err(Error::CpuListParse {
                        input: input.to_string(),
                        reason: format!("invalid range {}-{}", start, end),
                    });
                }
                cpus.extend(start..=end);
            } else {
                cpus.insert(parse_cpu_id(input, part)?);
            }
        }

        Ok(Self { cpus })
    }

    /// Build a set from pod-resources API ids, dropping ids that cannot be CPUs
    pub fn from_api_ids(ids: &[i64]) -> Self {
        ids.iter()
            .filter_map(|id| u32::try_from(*id).ok())
            .collect()
    }

    /// Number of CPUs in the set
    pub fn len(&self) -> usize {
        self.cpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpus.is_empty()
    }

    pub fn contains(&self, cpu: u32) -> bool {
        self.cpus.contains(&cpu)
    }

    /// Check membership of a pod-resources API id
    pub fn contains_api_id(&self, id: i64) -> bool {
        u32::try_from(id).map_or(false, |cpu| self.contains(cpu))
    }

    /// CPUs in `self` but not in `other`
    pub fn difference(&self, other: &CpuSet) -> CpuSet {
        Self {
            cpus: self.cpus.difference(&other.cpus).copied().collect(),
        }
    }

    /// CPUs in both sets
    pub fn intersection(&self, other: &CpuSet) -> CpuSet {
        Self {
            cpus: self.cpus.intersection(&other.cpus).copied().collect(),
        }
    }

    /// CPUs in either set
    pub fn union(&self, other: &CpuSet) -> CpuSet {
        Self {
            cpus: self.cpus.union(&other.cpus).copied().collect(),
        }
    }

    /// Iterate in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.cpus.iter().copied()
    }

    /// Ascending list of ids
    pub fn to_vec(&self) -> Vec<u32> {
        self.iter().collect()
    }

    /// Ascending list of ids in the pod-resources API representation
    pub fn to_api_ids(&self) -> Vec<i64> {
        self.iter().map(i64::from).collect()
    }
}

fn parse_cpu_id(input: &str, raw: &str) -> Result<u32> {
    raw.trim().parse().map_err(|e| Error::CpuListParse {
        input: input.to_string(),
        reason: format!("invalid cpu id {:?}: {}", raw, e),
    })
}

impl FromStr for CpuSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromIterator<u32> for CpuSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            cpus: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for CpuSet {
    /// Range-compressed form, e.g. `1-7,9-15`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.cpus.iter().copied().peekable();
        let mut first = true;
        while let Some(start) = iter.next() {
            let mut end = start;
            while let Some(&next) = iter.peek() {
                if next != end + 1 {
                    break;
                }
                end = next;
                iter.next();
            }

            if !first {
                write!(f, ",")?;
            }
            first = false;

            if start == end {
                write!(f, "{}", start)?;
            } else {
                write!(f, "{}-{}", start, end)?;
            }
        }
        Ok(())
    }
}

impl Serialize for CpuSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
