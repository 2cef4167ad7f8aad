//! Pipeline configuration
//!
//! Every field has a default matching the RoboKOP/CTD exports, so an empty
//! JSON object (or no file at all) is a valid configuration. CLI flags are
//! applied on top by the binary.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{CategoryPriority, FileKind};

/// 256 GiB
pub const DEFAULT_MAX_DB_SIZE: u64 = 274_877_906_944;

/// Inclusive range of partition numbers, `<prefix>1.csv ..= <prefix>N.csv`.
/// A range whose `last` is below `first` (e.g. `last: 0`) selects nothing,
/// which is how a node or edge pass is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRange {
    pub first: u32,
    pub last: u32,
}

impl PartitionRange {
    pub fn new(first: u32, last: u32) -> Self {
        Self { first, last }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> {
        self.first..=self.last
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }
}

/// Per-kind column handling during CSV conversion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnRules {
    /// `;`-separated cells rewritten as `[a,b,c]`
    pub list: Vec<String>,
    /// Float-typed cells truncated to integers (`3.0` → `3`)
    pub int: Vec<String>,
    /// Columns removed from the output
    pub drop: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl ColumnRules {
    pub fn node_defaults() -> Self {
        Self {
            list: strings(&["labels", "equivalent_identifiers", "hgvs"]),
            int: strings(&[
                "lipinski", "arom_c", "sp3_c", "sp2_c", "sp_c", "halogen", "hetero_sp2_c", "rotb",
                "o_n", "oh_nh", "rgb", "fda_labels",
            ]),
            drop: Vec::new(),
        }
    }

    pub fn edge_defaults() -> Self {
        Self {
            list: strings(&[
                "p_value",
                "supporting_affinities",
                "slope",
                "publications",
                "hetio_source",
                "tmkp_ids",
                "expressed_in",
                "pubchem_assay_ids",
                "patent_ids",
                "aggregator_knowledge_source",
                "category",
                "provided_by",
                "complex_context",
                "has_evidence",
                "qualifiers",
                "phosphorylation_sites",
                "drugmechdb_path_id",
            ]),
            int: strings(&["distance_to_feature"]),
            drop: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub node_partitions: PartitionRange,
    pub edge_partitions: PartitionRange,

    /// Class priority for picking a node's table
    pub categories: CategoryPriority,

    #[serde(default = "ColumnRules::node_defaults")]
    pub node_columns: ColumnRules,
    #[serde(default = "ColumnRules::edge_defaults")]
    pub edge_columns: ColumnRules,

    /// Tab-delimited `name:type` header files, relative to the data dir
    pub node_header_file: String,
    pub edge_header_file: String,

    /// Serialized lookups written by the lookups stage
    pub node_lookup_file: String,
    pub edge_lookup_file: String,

    pub max_db_size: u64,

    /// External shells used by the `shell` sink
    pub kuzu_shell: String,
    pub memgraph_shell: String,
    pub memgraph_args: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            node_partitions: PartitionRange::new(1, 20),
            edge_partitions: PartitionRange::new(1, 23),
            categories: CategoryPriority::default(),
            node_columns: ColumnRules::node_defaults(),
            edge_columns: ColumnRules::edge_defaults(),
            node_header_file: "rk-nodes.tab-hdr.temp_csv".to_string(),
            edge_header_file: "rk-edges.tab-hdr.temp_csv".to_string(),
            node_lookup_file: "serialized_node_classes.bin".to_string(),
            edge_lookup_file: "serialized_edge_predicates.bin".to_string(),
            max_db_size: DEFAULT_MAX_DB_SIZE,
            kuzu_shell: "kuzu".to_string(),
            memgraph_shell: "mgconsole".to_string(),
            memgraph_args: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file, or defaults when `path` is `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let file = File::open(path)?;
                let config = serde_json::from_reader(BufReader::new(file))?;
                tracing::debug!("Loaded configuration from {:?}", path);
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn partitions(&self, kind: FileKind) -> PartitionRange {
        match kind {
            FileKind::Node => self.node_partitions,
            FileKind::Edge => self.edge_partitions,
        }
    }

    pub fn columns(&self, kind: FileKind) -> &ColumnRules {
        match kind {
            FileKind::Node => &self.node_columns,
            FileKind::Edge => &self.edge_columns,
        }
    }

    pub fn header_file(&self, kind: FileKind) -> &str {
        match kind {
            FileKind::Node => &self.node_header_file,
            FileKind::Edge => &self.edge_header_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partition_range() {
        assert_eq!(PartitionRange::new(1, 3).iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(PartitionRange::new(11, 12).iter().collect::<Vec<_>>(), vec![11, 12]);

        let skipped = PartitionRange::new(1, 0);
        assert!(skipped.is_empty());
        assert_eq!(skipped.iter().count(), 0);
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.partitions(FileKind::Node).iter().count(), 20);
        assert_eq!(config.partitions(FileKind::Edge).iter().count(), 23);
        assert!(config.columns(FileKind::Node).list.contains(&"labels".to_string()));
        assert_eq!(config.columns(FileKind::Edge).int, vec!["distance_to_feature"]);
        assert_eq!(config.max_db_size, 256 * 1024 * 1024 * 1024);
    }

    #[test]
    fn test_partial_json_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"node_partitions": {{"first": 11, "last": 12}}, "edge_columns": {{"list": ["publications"]}}}}"#
        )
        .unwrap();

        let config = PipelineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.node_partitions, PartitionRange::new(11, 12));
        assert_eq!(config.edge_partitions, PartitionRange::new(1, 23));
        assert_eq!(config.edge_columns.list, vec!["publications"]);
        assert!(config.edge_columns.int.is_empty());
        assert_eq!(config.node_columns, ColumnRules::node_defaults());
        assert_eq!(config.categories, CategoryPriority::default());
    }

    #[test]
    fn test_load_none_is_default() {
        let config = PipelineConfig::load(None).unwrap();
        assert_eq!(config.kuzu_shell, "kuzu");
    }
}
