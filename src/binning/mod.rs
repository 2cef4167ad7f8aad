//! Split converted partitions into one file per node class / edge triple
//!
//! Nodes are keyed by class (`rk-nodes-bin-Gene.csv`), edges by
//! `<predicate>_<subject class>_<object class>`
//! (`rk-edges-bin-treats_SmallMolecule_Disease.csv`), which is the
//! granularity of a single Kuzu COPY.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use crate::error::{LoadError, Result};
use crate::lookup::{first_list_item, NodeClassLookup};
use crate::model::class_name;
use crate::partition::PartitionFiles;
use crate::timing::StageTimer;

/// Rows written per output key, plus rows that could not be routed
#[derive(Debug, Clone, Default)]
pub struct BinReport {
    pub rows: BTreeMap<String, u64>,
    pub skipped: u64,
}

impl BinReport {
    pub fn total_rows(&self) -> u64 {
        self.rows.values().sum()
    }
}

/// Edge bin key
pub fn edge_key(predicate: &str, from_class: &str, to_class: &str) -> String {
    format!("{}_{}_{}", predicate, from_class, to_class)
}

/// Open output files, one per key. Each file gets the source header once.
struct BinWriters<'a> {
    files: &'a PartitionFiles,
    header: csv::StringRecord,
    writers: HashMap<String, csv::Writer<File>>,
}

impl<'a> BinWriters<'a> {
    fn new(files: &'a PartitionFiles) -> Self {
        Self {
            files,
            header: csv::StringRecord::new(),
            writers: HashMap::new(),
        }
    }

    fn write(&mut self, key: &str, record: &csv::StringRecord) -> Result<()> {
        if !self.writers.contains_key(key) {
            let path = self.files.bin_path(key);
            tracing::debug!("Creating bin file {:?}", path);
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(&self.header)?;
            self.writers.insert(key.to_string(), writer);
        }

        if let Some(writer) = self.writers.get_mut(key) {
            writer.write_record(record)?;
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        for (_, mut writer) in self.writers {
            writer.flush()?;
        }
        Ok(())
    }
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

type RowKey<'r> = Box<dyn Fn(&csv::StringRecord) -> Option<String> + 'r>;

/// Route every row of every converted partition through `route`.
/// `route` gets the file header and returns a per-row key function;
/// a `None` key skips the row.
fn bin_with<'r, F>(files: &PartitionFiles, mut route: F) -> Result<BinReport>
where
    F: FnMut(&csv::StringRecord, &Path) -> Result<RowKey<'r>>,
{
    let mut writers = BinWriters::new(files);
    let mut report = BinReport::default();

    for path in files.converted_files() {
        tracing::debug!("Binning file {:?}", path);

        let mut reader = csv::Reader::from_path(&path)?;
        let header = reader.headers()?.clone();
        let key_of = route(&header, &path)?;
        writers.header = header;

        let mut record = csv::StringRecord::new();
        let mut skipped = 0u64;
        while reader.read_record(&mut record)? {
            match key_of(&record) {
                Some(key) => {
                    writers.write(&key, &record)?;
                    *report.rows.entry(key).or_insert(0) += 1;
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!("{} row(s) in {:?} could not be binned, skipped", skipped, path);
        }
        report.skipped += skipped;
    }

    writers.finish()?;
    Ok(report)
}

/// Bin node partitions by the class at the head of each row's `labels`
pub fn bin_nodes(files: &PartitionFiles) -> Result<BinReport> {
    let _timer = StageTimer::start("bin", "NODE data binned");

    let report = bin_with(files, |header, path| {
        let labels = column_index(header, "labels", path)?;
        let key: RowKey = Box::new(move |record: &csv::StringRecord| {
            record
                .get(labels)
                .and_then(first_list_item)
                .map(|label| class_name(label).to_string())
        });
        Ok(key)
    })?;

    tracing::info!(
        "Binned {} node row(s) into {} class file(s)",
        report.total_rows(),
        report.rows.len()
    );
    Ok(report)
}

/// Bin edge partitions by predicate and endpoint classes. Edges whose
/// endpoints are not in `nodes` are skipped.
pub fn bin_edges(files: &PartitionFiles, nodes: &NodeClassLookup) -> Result<BinReport> {
    let _timer = StageTimer::start("bin", "EDGE data binned");

    let report = bin_with(files, |header, path| {
        let from = column_index(header, "from", path)?;
        let to = column_index(header, "to", path)?;
        let label = column_index(header, "label", path)?;

        let key: RowKey = Box::new(move |record: &csv::StringRecord| {
            let from_class = nodes.class_of(record.get(from)?)?;
            let to_class = nodes.class_of(record.get(to)?)?;
            let predicate = class_name(record.get(label)?);
            Some(edge_key(predicate, from_class, to_class))
        });
        Ok(key)
    })?;

    tracing::info!(
        "Binned {} edge row(s) into {} file(s), {} skipped",
        report.total_rows(),
        report.rows.len(),
        report.skipped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PartitionRange;
    use std::fs;
    use tempfile::TempDir;

    fn lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_bin_nodes_header_written_once() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("rk-nodes-conv1.csv"),
            "id,name,labels\nNCBIGene:1,A1BG,[biolink:Gene]\nMONDO:1,x,[biolink:Disease]\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("rk-nodes-conv2.csv"),
            "id,name,labels\nNCBIGene:2,A2M,\"[biolink:Gene,biolink:Protein]\"\nZ:1,z,[]\n",
        )
        .unwrap();

        let files = PartitionFiles::new(dir.path(), "rk-nodes-pt", PartitionRange::new(1, 2));
        let report = bin_nodes(&files).unwrap();

        assert_eq!(report.rows.get("Gene"), Some(&2));
        assert_eq!(report.rows.get("Disease"), Some(&1));
        assert_eq!(report.skipped, 1);

        let gene = lines(&dir.path().join("rk-nodes-bin-Gene.csv"));
        assert_eq!(gene.len(), 3);
        assert_eq!(gene[0], "id,name,labels");
        assert_eq!(gene[2], "NCBIGene:2,A2M,\"[biolink:Gene,biolink:Protein]\"");
    }

    #[test]
    fn test_bin_edges_by_triple() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("rk-edges-conv1.csv"),
            "from,to,subject,label,object\n\
             CHEBI:1,MONDO:1,CHEBI:1,biolink:treats,MONDO:1\n\
             CHEBI:2,MONDO:1,CHEBI:2,biolink:treats,MONDO:1\n\
             CHEBI:1,NOPE:1,CHEBI:1,biolink:treats,NOPE:1\n",
        )
        .unwrap();

        let mut nodes = NodeClassLookup::new();
        nodes.insert("CHEBI:1", "SmallMolecule");
        nodes.insert("CHEBI:2", "SmallMolecule");
        nodes.insert("MONDO:1", "Disease");

        let files = PartitionFiles::new(dir.path(), "rk-edges-pt", PartitionRange::new(1, 1));
        let report = bin_edges(&files, &nodes).unwrap();

        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows.get("treats_SmallMolecule_Disease"), Some(&2));
        assert_eq!(report.skipped, 1);

        let out = lines(&dir.path().join("rk-edges-bin-treats_SmallMolecule_Disease.csv"));
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], "from,to,subject,label,object");
    }
}
