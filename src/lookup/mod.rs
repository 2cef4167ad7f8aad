//! Node-class and edge-predicate lookups
//!
//! Built once from the converted partitions and persisted with bincode so
//! the later stages (binning, tables, import) can run as separate
//! invocations.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, Result};
use crate::model::class_name;
use crate::partition::PartitionFiles;
use crate::timing::StageTimer;

/// First element of a converted list cell: `[biolink:Gene,biolink:Protein]` → `biolink:Gene`
pub fn first_list_item(cell: &str) -> Option<&str> {
    let inner = cell.trim().trim_start_matches('[').trim_end_matches(']');
    inner
        .split(',')
        .next()
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn column_index(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| LoadError::MissingColumn {
            column: name.to_string(),
            path: path.to_path_buf(),
        })
}

fn save_bincode<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn load_bincode<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(LoadError::MissingLookup(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(bincode::deserialize_from(reader)?)
}

/// Node id → preferred class (`Gene`, `SmallMolecule`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeClassLookup {
    classes: HashMap<String, String>,
}

impl NodeClassLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every converted node partition in parallel
    pub fn build(files: &PartitionFiles) -> Result<Self> {
        let _timer = StageTimer::start("lookups", "Node class lookup created");

        let parts = files
            .converted_files()
            .par_iter()
            .map(|path| Self::scan_file(path))
            .collect::<Result<Vec<_>>>()?;

        let mut lookup = Self::new();
        for part in parts {
            lookup.classes.extend(part.classes);
        }

        if lookup.is_empty() {
            tracing::warn!("Node class lookup is empty; no node rows found under {:?}", files.dir());
        } else {
            tracing::info!("Node class lookup: {} node(s)", lookup.len());
        }
        Ok(lookup)
    }

    /// Lookup entries of one converted node file. Rows without labels are skipped.
    pub fn scan_file(path: &Path) -> Result<Self> {
        tracing::debug!("Scanning node file {:?}", path);

        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let id_col = column_index(&headers, "id", path)?;
        let labels_col = column_index(&headers, "labels", path)?;

        let mut lookup = Self::new();
        let mut unlabeled = 0u64;
        let mut record = csv::StringRecord::new();

        while reader.read_record(&mut record)? {
            let id = record.get(id_col).unwrap_or("");
            match record.get(labels_col).and_then(first_list_item) {
                Some(label) => lookup.insert(id, class_name(label)),
                None => unlabeled += 1,
            }
        }

        if unlabeled > 0 {
            tracing::warn!("{} node row(s) without labels skipped in {:?}", unlabeled, path);
        }
        Ok(lookup)
    }

    pub fn insert(&mut self, id: impl Into<String>, class: impl Into<String>) {
        self.classes.insert(id.into(), class.into());
    }

    pub fn class_of(&self, id: &str) -> Option<&str> {
        self.classes.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Distinct classes, sorted
    pub fn classes(&self) -> Vec<String> {
        let distinct: BTreeSet<&String> = self.classes.values().collect();
        distinct.into_iter().cloned().collect()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_bincode(self, path.as_ref())?;
        tracing::debug!("Node class lookup saved to {:?}", path.as_ref());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let lookup: Self = load_bincode(path.as_ref())?;
        if lookup.is_empty() {
            tracing::warn!("Node class lookup loaded from {:?} is empty", path.as_ref());
        }
        Ok(lookup)
    }
}

/// Predicate → every (subject class, object class) pair it connects
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgePredicateLookup {
    predicates: BTreeMap<String, BTreeSet<(String, String)>>,
}

impl EdgePredicateLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(files: &PartitionFiles, nodes: &NodeClassLookup) -> Result<Self> {
        let _timer = StageTimer::start("lookups", "Edge predicate lookup created");

        let parts = files
            .converted_files()
            .par_iter()
            .map(|path| Self::scan_file(path, nodes))
            .collect::<Result<Vec<_>>>()?;

        let mut lookup = Self::new();
        for part in parts {
            lookup.merge(part);
        }

        if lookup.is_empty() {
            tracing::warn!("Edge predicate lookup is empty; no edge rows matched known nodes");
        } else {
            tracing::info!(
                "Edge predicate lookup: {} predicate(s), {} class pair(s)",
                lookup.len(),
                lookup.pair_count()
            );
        }
        Ok(lookup)
    }

    /// Lookup entries of one converted edge file. Edges whose endpoints are
    /// not in `nodes` are skipped.
    pub fn scan_file(path: &Path, nodes: &NodeClassLookup) -> Result<Self> {
        tracing::debug!("Scanning edge file {:?}", path);

        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let from_col = column_index(&headers, "from", path)?;
        let to_col = column_index(&headers, "to", path)?;
        let label_col = column_index(&headers, "label", path)?;

        let mut lookup = Self::new();
        let mut unmatched = 0u64;
        let mut record = csv::StringRecord::new();

        while reader.read_record(&mut record)? {
            let from = nodes.class_of(record.get(from_col).unwrap_or(""));
            let to = nodes.class_of(record.get(to_col).unwrap_or(""));
            match (from, to) {
                (Some(from), Some(to)) => {
                    let predicate = class_name(record.get(label_col).unwrap_or(""));
                    lookup.insert(predicate, from, to);
                }
                _ => unmatched += 1,
            }
        }

        if unmatched > 0 {
            tracing::warn!("{} edge row(s) with unknown endpoints skipped in {:?}", unmatched, path);
        }
        Ok(lookup)
    }

    pub fn insert(&mut self, predicate: &str, from: &str, to: &str) {
        self.predicates
            .entry(predicate.to_string())
            .or_default()
            .insert((from.to_string(), to.to_string()));
    }

    pub fn merge(&mut self, other: EdgePredicateLookup) {
        for (predicate, pairs) in other.predicates {
            self.predicates.entry(predicate).or_default().extend(pairs);
        }
    }

    pub fn pairs(&self, predicate: &str) -> Option<&BTreeSet<(String, String)>> {
        self.predicates.get(predicate)
    }

    /// Entries sorted by predicate, pairs sorted within each
    pub fn predicates(&self) -> impl Iterator<Item = (&String, &BTreeSet<(String, String)>)> {
        self.predicates.iter()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn pair_count(&self) -> usize {
        self.predicates.values().map(BTreeSet::len).sum()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_bincode(self, path.as_ref())?;
        tracing::debug!("Edge predicate lookup saved to {:?}", path.as_ref());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let lookup: Self = load_bincode(path.as_ref())?;
        if lookup.is_empty() {
            tracing::warn!("Edge predicate lookup loaded from {:?} is empty", path.as_ref());
        }
        Ok(lookup)
    }
}

/// Lookup file locations inside a data directory
#[derive(Debug, Clone)]
pub struct LookupFiles {
    pub nodes: PathBuf,
    pub edges: PathBuf,
}

impl LookupFiles {
    pub fn new<P: AsRef<Path>>(dir: P, node_file: &str, edge_file: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            nodes: dir.join(node_file),
            edges: dir.join(edge_file),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartitionRange;
    use std::fs;
    use tempfile::TempDir;

    fn write_nodes(dir: &Path) -> PartitionFiles {
        fs::write(
            dir.join("n-conv1.csv"),
            "id,labels\nCHEBI:1,\"[biolink:SmallMolecule,biolink:ChemicalEntity]\"\nNCBIGene:1,[biolink:Gene]\n",
        )
        .unwrap();
        fs::write(
            dir.join("n-conv2.csv"),
            "id,labels\nMONDO:1,[biolink:Disease]\nX:1,[]\n",
        )
        .unwrap();
        PartitionFiles::new(dir, "n-pt", PartitionRange::new(1, 2))
    }

    #[test]
    fn test_first_list_item() {
        assert_eq!(first_list_item("[biolink:Gene,biolink:Protein]"), Some("biolink:Gene"));
        assert_eq!(first_list_item("[biolink:Gene]"), Some("biolink:Gene"));
        assert_eq!(first_list_item("[]"), None);
        assert_eq!(first_list_item(""), None);
    }

    #[test]
    fn test_node_lookup_records_every_row() {
        let dir = TempDir::new().unwrap();
        let files = write_nodes(dir.path());

        let lookup = NodeClassLookup::build(&files).unwrap();
        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.class_of("CHEBI:1"), Some("SmallMolecule"));
        assert_eq!(lookup.class_of("NCBIGene:1"), Some("Gene"));
        assert_eq!(lookup.class_of("MONDO:1"), Some("Disease"));
        assert_eq!(lookup.class_of("X:1"), None);
        assert_eq!(lookup.classes(), vec!["Disease", "Gene", "SmallMolecule"]);
    }

    #[test]
    fn test_edge_lookup() {
        let dir = TempDir::new().unwrap();
        let node_files = write_nodes(dir.path());
        let nodes = NodeClassLookup::build(&node_files).unwrap();

        fs::write(
            dir.path().join("e-conv1.csv"),
            "from,to,subject,label,object\n\
             CHEBI:1,MONDO:1,CHEBI:1,biolink:treats,MONDO:1\n\
             CHEBI:1,NCBIGene:1,CHEBI:1,biolink:affects,NCBIGene:1\n\
             MONDO:1,NCBIGene:1,MONDO:1,biolink:affects,NCBIGene:1\n\
             CHEBI:1,UNKNOWN:1,CHEBI:1,biolink:treats,UNKNOWN:1\n",
        )
        .unwrap();
        let edge_files = PartitionFiles::new(dir.path(), "e-pt", PartitionRange::new(1, 1));

        let lookup = EdgePredicateLookup::build(&edge_files, &nodes).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.pair_count(), 3);

        let affects: Vec<_> = lookup.pairs("affects").unwrap().iter().cloned().collect();
        assert_eq!(
            affects,
            vec![
                ("Disease".to_string(), "Gene".to_string()),
                ("SmallMolecule".to_string(), "Gene".to_string()),
            ]
        );

        let names: Vec<_> = lookup.predicates().map(|(p, _)| p.as_str()).collect();
        assert_eq!(names, vec!["affects", "treats"]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let mut nodes = NodeClassLookup::new();
        nodes.insert("A:1", "Gene");
        let mut edges = EdgePredicateLookup::new();
        edges.insert("treats", "SmallMolecule", "Disease");

        let files = LookupFiles::new(dir.path(), "nodes.bin", "edges.bin");
        nodes.save(&files.nodes).unwrap();
        edges.save(&files.edges).unwrap();

        assert_eq!(NodeClassLookup::load(&files.nodes).unwrap(), nodes);
        assert_eq!(EdgePredicateLookup::load(&files.edges).unwrap(), edges);
    }

    #[test]
    fn test_load_missing_lookup() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            NodeClassLookup::load(dir.path().join("absent.bin")),
            Err(LoadError::MissingLookup(_))
        ));
    }

    #[test]
    fn test_missing_labels_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("n-conv1.csv");
        fs::write(&path, "id,name\nA:1,x\n").unwrap();
        assert!(matches!(
            NodeClassLookup::scan_file(&path),
            Err(LoadError::MissingColumn { .. })
        ));
    }
}
