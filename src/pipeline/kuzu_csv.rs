//! Partitioned CSV export → per-class Kuzu tables
//!
//! Stages run in order: convert, lookups, bin, tables, import. Each one
//! reads what the previous one left in the data directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::{wipe_database, SinkFactory};
use crate::binning::{self, edge_key, BinReport};
use crate::config::PipelineConfig;
use crate::convert::{convert_partitions, ConvertReport};
use crate::error::{LoadError, Result};
use crate::loader::{SinkMode, StatementSink};
use crate::lookup::{EdgePredicateLookup, LookupFiles, NodeClassLookup};
use crate::model::FileKind;
use crate::partition::PartitionFiles;
use crate::schema::{kuzu, HeaderSchema};
use crate::timing::StageTimer;

/// One step of the CSV pipeline. Each stage reads what the previous
/// one left on disk, so they can run as separate invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Convert,
    Lookups,
    Bin,
    Tables,
    Import,
    /// Every stage in order
    All,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Convert => "convert",
            Stage::Lookups => "lookups",
            Stage::Bin => "bin",
            Stage::Tables => "tables",
            Stage::Import => "import",
            Stage::All => "all",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "convert" => Ok(Stage::Convert),
            "lookups" | "create_lus" => Ok(Stage::Lookups),
            "bin" => Ok(Stage::Bin),
            "tables" => Ok(Stage::Tables),
            "import" | "data" => Ok(Stage::Import),
            "all" => Ok(Stage::All),
            _ => Err(LoadError::UnknownStage(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub node_files: usize,
    pub edge_files: usize,
    /// Edge COPYs the database rejected; logged and skipped
    pub edge_failures: usize,
    /// Expected bin files that did not exist
    pub missing_files: usize,
}

pub struct KuzuCsvPipeline<'a> {
    config: &'a PipelineConfig,
    data_dir: PathBuf,
    nodes: PartitionFiles,
    edges: PartitionFiles,
    lookups: LookupFiles,
    database: PathBuf,
}

impl<'a> KuzuCsvPipeline<'a> {
    /// `node_prefix` / `edge_prefix` are raw export prefixes (`rk-nodes-pt`);
    /// the database lives at `data_dir/database`.
    pub fn new<P: AsRef<Path>>(
        config: &'a PipelineConfig,
        data_dir: P,
        node_prefix: &str,
        edge_prefix: &str,
        database: &str,
    ) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            config,
            nodes: PartitionFiles::new(&data_dir, node_prefix, config.partitions(FileKind::Node)),
            edges: PartitionFiles::new(&data_dir, edge_prefix, config.partitions(FileKind::Edge)),
            lookups: LookupFiles::new(&data_dir, &config.node_lookup_file, &config.edge_lookup_file),
            database: data_dir.join(database),
            data_dir,
        }
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    pub fn node_files(&self) -> &PartitionFiles {
        &self.nodes
    }

    pub fn edge_files(&self) -> &PartitionFiles {
        &self.edges
    }

    /// Run one stage. `open_sink` is only called by stages that talk to the database.
    pub fn run(&self, stage: Stage, open_sink: &mut SinkFactory<'_>) -> Result<()> {
        tracing::info!("Running {} stage on {:?}", stage, self.data_dir);

        match stage {
            Stage::Convert => {
                self.convert()?;
            }
            Stage::Lookups => {
                self.create_lookups()?;
            }
            Stage::Bin => {
                self.bin()?;
            }
            Stage::Tables => {
                wipe_database(&self.database)?;
                let mut sink = open_sink(SinkMode::Fresh)?;
                self.create_tables(sink.as_mut())?;
                sink.finish()?;
            }
            Stage::Import => {
                let mut sink = open_sink(SinkMode::Append)?;
                self.import(sink.as_mut())?;
                sink.finish()?;
            }
            Stage::All => {
                self.convert()?;
                self.create_lookups()?;
                self.bin()?;
                wipe_database(&self.database)?;
                let mut sink = open_sink(SinkMode::Fresh)?;
                self.create_tables(sink.as_mut())?;
                self.import(sink.as_mut())?;
                sink.finish()?;
            }
        }
        Ok(())
    }

    pub fn convert(&self) -> Result<(ConvertReport, ConvertReport)> {
        let nodes = convert_partitions(self.config, &self.nodes, FileKind::Node)?;
        let edges = convert_partitions(self.config, &self.edges, FileKind::Edge)?;
        Ok((nodes, edges))
    }

    /// Build both lookups from the converted partitions and persist them
    pub fn create_lookups(&self) -> Result<(NodeClassLookup, EdgePredicateLookup)> {
        let nodes = NodeClassLookup::build(&self.nodes)?;
        nodes.save(&self.lookups.nodes)?;

        let edges = EdgePredicateLookup::build(&self.edges, &nodes)?;
        edges.save(&self.lookups.edges)?;

        Ok((nodes, edges))
    }

    pub fn bin(&self) -> Result<(BinReport, BinReport)> {
        let _timer = StageTimer::start("bin", "Node and edge data binned");

        let node_report = binning::bin_nodes(&self.nodes)?;
        let lookup = NodeClassLookup::load(&self.lookups.nodes)?;
        let edge_report = binning::bin_edges(&self.edges, &lookup)?;

        Ok((node_report, edge_report))
    }

    fn load_lookups(&self) -> Result<(NodeClassLookup, EdgePredicateLookup)> {
        Ok((
            NodeClassLookup::load(&self.lookups.nodes)?,
            EdgePredicateLookup::load(&self.lookups.edges)?,
        ))
    }

    /// One node table per class and one rel table per predicate, both sorted.
    /// Returns the number of tables created.
    pub fn create_tables(&self, sink: &mut dyn StatementSink) -> Result<usize> {
        let _timer = StageTimer::start("tables", "Table definitions created");

        let (nodes, edges) = self.load_lookups()?;
        let node_schema = HeaderSchema::read(
            self.data_dir.join(self.config.header_file(FileKind::Node)),
            FileKind::Node,
        )?;
        let edge_schema = HeaderSchema::read(
            self.data_dir.join(self.config.header_file(FileKind::Edge)),
            FileKind::Edge,
        )?;

        let node_ddl = node_schema.ddl();
        let edge_ddl = edge_schema.ddl();
        let mut created = 0;

        for class in nodes.classes() {
            tracing::debug!("Creating node table {}", class);
            sink.execute(&kuzu::create_node_table(&class, &node_ddl))?;
            created += 1;
        }

        for (predicate, pairs) in edges.predicates() {
            tracing::debug!("Creating rel table {} ({} pair(s))", predicate, pairs.len());
            sink.execute(&kuzu::create_rel_table(predicate, pairs, &edge_ddl))?;
            created += 1;
        }

        tracing::info!("Created {} table(s)", created);
        Ok(created)
    }

    /// COPY every bin file. Node failures abort; edge failures are logged
    /// and the import continues with the next file.
    pub fn import(&self, sink: &mut dyn StatementSink) -> Result<ImportReport> {
        let _timer = StageTimer::start("import", "Node and edge data imported");

        let (nodes, edges) = self.load_lookups()?;
        let mut report = ImportReport::default();

        {
            let _timer = StageTimer::start("import", "Node data imported");
            for class in nodes.classes() {
                let path = self.nodes.bin_path(&class);
                if !path.exists() {
                    tracing::warn!("Node file {:?} not found, skipping", path);
                    report.missing_files += 1;
                    continue;
                }

                tracing::debug!("Loading {} nodes from {:?}", class, path);
                sink.execute(&kuzu::copy_node_csv(&class, &path))?;
                report.node_files += 1;
            }
        }

        {
            let _timer = StageTimer::start("import", "Edge data imported");
            for (predicate, pairs) in edges.predicates() {
                for (from, to) in pairs {
                    let path = self.edges.bin_path(&edge_key(predicate, from, to));
                    if !path.exists() {
                        tracing::warn!("Edge file {:?} not found, skipping", path);
                        report.missing_files += 1;
                        continue;
                    }

                    let statement = kuzu::copy_rel_csv(predicate, &path, from, to);
                    match sink.execute(&statement) {
                        Ok(()) => report.edge_files += 1,
                        Err(e) => {
                            tracing::error!("Edge import of {:?} failed, continuing: {}", path, e);
                            report.edge_failures += 1;
                        }
                    }
                }
            }
        }

        tracing::info!(
            "Imported {} node file(s), {} edge file(s); {} edge failure(s), {} missing file(s)",
            report.node_files,
            report.edge_files,
            report.edge_failures,
            report.missing_files
        );
        Ok(report)
    }
}
