//! Partition file naming
//!
//! An export is split into numbered files. Each pipeline stage derives its
//! own file names from the export prefix:
//!
//! - raw:       `rk-nodes-pt7.csv`
//! - converted: `rk-nodes-conv7.csv`
//! - binned:    `rk-nodes-bin-Gene.csv`, `rk-edges-bin-treats_SmallMolecule_Disease.csv`

use std::path::{Path, PathBuf};

use crate::config::PartitionRange;

const RAW_MARKER: &str = "pt";
const CONVERTED_MARKER: &str = "conv";
const BINNED_MARKER: &str = "bin-";

/// Replace the last occurrence of `from`, or append `to` when absent
fn swap_marker(prefix: &str, from: &str, to: &str) -> String {
    match prefix.rfind(from) {
        Some(pos) => format!("{}{}{}", &prefix[..pos], to, &prefix[pos + from.len()..]),
        None => format!("{}{}", prefix, to),
    }
}

#[derive(Debug, Clone)]
pub struct PartitionFiles {
    dir: PathBuf,
    raw_prefix: String,
    converted_prefix: String,
    binned_prefix: String,
    range: PartitionRange,
}

impl PartitionFiles {
    /// `prefix` is the raw export prefix (e.g. `rk-nodes-pt`)
    pub fn new<P: AsRef<Path>>(dir: P, prefix: &str, range: PartitionRange) -> Self {
        let converted_prefix = swap_marker(prefix, RAW_MARKER, CONVERTED_MARKER);
        let binned_prefix = swap_marker(&converted_prefix, CONVERTED_MARKER, BINNED_MARKER);

        Self {
            dir: dir.as_ref().to_path_buf(),
            raw_prefix: prefix.to_string(),
            converted_prefix,
            binned_prefix,
            range,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn raw_path(&self, n: u32) -> PathBuf {
        self.dir.join(format!("{}{}.csv", self.raw_prefix, n))
    }

    pub fn converted_path(&self, n: u32) -> PathBuf {
        self.dir.join(format!("{}{}.csv", self.converted_prefix, n))
    }

    pub fn bin_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}.csv", self.binned_prefix, key))
    }

    /// `(raw, converted)` path pairs for every partition in range
    pub fn conversions(&self) -> Vec<(PathBuf, PathBuf)> {
        self.range
            .iter()
            .map(|n| (self.raw_path(n), self.converted_path(n)))
            .collect()
    }

    pub fn converted_files(&self) -> Vec<PathBuf> {
        self.range.iter().map(|n| self.converted_path(n)).collect()
    }
}

/// Forward-slash rendering used inside database statements, on every platform
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
