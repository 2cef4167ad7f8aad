//! JSONL export → Memgraph `import_util.json` files

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::convert::json::{self, encode_edge, encode_node, JsonArrayWriter, JsonFormat};
use crate::error::{LoadError, Result};
use crate::loader::StatementSink;
use crate::model::{EdgeRecord, JsonLines, NodeRecord};
use crate::schema::memgraph;
use crate::timing::StageTimer;

/// What to produce from the JSONL inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemgraphMode {
    /// Nodes only, written to `<outfile>`
    Node,
    /// Edges only, written to `<outfile>`
    Edge,
    /// All nodes, then all edges, in `<outfile>.json`
    Merge,
    /// Edge chunks of `lines_per_file` (`<= 0`: everything), each preceded by
    /// the nodes they reference, in `<outfile>-<lines_per_file>-<n>.json`.
    /// Stops after `output_file_count` files when that is non-zero.
    Chunked {
        lines_per_file: i64,
        output_file_count: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemgraphReport {
    pub files: Vec<PathBuf>,
    pub nodes: u64,
    pub edges: u64,
}

pub struct MemgraphPipeline {
    data_dir: PathBuf,
    node_infile: Option<PathBuf>,
    edge_infile: Option<PathBuf>,
    outfile: String,
    max_items: Option<u64>,
}

impl MemgraphPipeline {
    pub fn new<P: AsRef<Path>>(data_dir: P, outfile: &str) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            node_infile: None,
            edge_infile: None,
            outfile: outfile.to_string(),
            max_items: None,
        }
    }

    pub fn node_infile(mut self, name: &str) -> Self {
        self.node_infile = Some(self.data_dir.join(name));
        self
    }

    pub fn edge_infile(mut self, name: &str) -> Self {
        self.edge_infile = Some(self.data_dir.join(name));
        self
    }

    /// Cap on records written in `Node` / `Edge` mode
    pub fn max_items(mut self, max_items: Option<u64>) -> Self {
        self.max_items = max_items;
        self
    }

    fn nodes_input(&self) -> Result<&Path> {
        self.node_infile.as_deref().ok_or(LoadError::MissingInput("node"))
    }

    fn edges_input(&self) -> Result<&Path> {
        self.edge_infile.as_deref().ok_or(LoadError::MissingInput("edge"))
    }

    pub fn convert(&self, mode: MemgraphMode) -> Result<MemgraphReport> {
        match mode {
            MemgraphMode::Node => {
                let _timer = StageTimer::start("nodes", "Nodes parsed");
                let output = self.data_dir.join(&self.outfile);
                let nodes = json::convert_nodes(self.nodes_input()?, &output, JsonFormat::Memgraph, self.max_items)?;
                tracing::info!("{} node(s) written to {:?}", nodes, output);
                Ok(MemgraphReport {
                    files: vec![output],
                    nodes,
                    edges: 0,
                })
            }
            MemgraphMode::Edge => {
                let _timer = StageTimer::start("edges", "Edges parsed");
                let output = self.data_dir.join(&self.outfile);
                let edges = json::convert_edges(self.edges_input()?, &output, JsonFormat::Memgraph, self.max_items)?;
                tracing::info!("{} edge(s) written to {:?}", edges, output);
                Ok(MemgraphReport {
                    files: vec![output],
                    nodes: 0,
                    edges,
                })
            }
            MemgraphMode::Merge => self.merge(),
            MemgraphMode::Chunked {
                lines_per_file,
                output_file_count,
            } => self.chunked(lines_per_file, output_file_count),
        }
    }

    fn merge(&self) -> Result<MemgraphReport> {
        let _timer = StageTimer::start("merge", "Nodes and edges merged");
        let (nodes_in, edges_in) = (self.nodes_input()?, self.edges_input()?);
        let output = self.data_dir.join(format!("{}.json", self.outfile));

        let mut out = JsonArrayWriter::create(&output)?;
        let nodes = json::append_nodes(nodes_in, JsonFormat::Memgraph, &mut out, None)?;
        let mut next_id = 0;
        let edges = json::append_edges(edges_in, JsonFormat::Memgraph, &mut out, None, &mut next_id)?;
        out.finish()?;

        tracing::info!("{} node(s) and {} edge(s) merged into {:?}", nodes, edges, output);
        Ok(MemgraphReport {
            files: vec![output],
            nodes,
            edges,
        })
    }

    fn chunked(&self, lines_per_file: i64, output_file_count: usize) -> Result<MemgraphReport> {
        let (nodes_in, edges_in) = (self.nodes_input()?, self.edges_input()?);
        let limit = usize::try_from(lines_per_file).ok().filter(|&n| n > 0);

        tracing::info!(
            "Chunking edges: {} per file, {}",
            limit.map_or("all".to_string(), |n| n.to_string()),
            if output_file_count > 0 {
                format!("at most {} file(s)", output_file_count)
            } else {
                "as many files as it takes".to_string()
            }
        );

        let mut edges = JsonLines::<EdgeRecord>::open(edges_in)?;
        let mut report = MemgraphReport::default();
        let mut next_id = 0u64;

        loop {
            let _timer = StageTimer::start("chunk", format!("Chunk {} processed", report.files.len() + 1));

            let mut chunk: Vec<String> = Vec::new();
            let mut needed: HashSet<String> = HashSet::new();
            let mut edges_done = false;

            while limit.map_or(true, |n| chunk.len() < n) {
                let Some(edge) = edges.next() else {
                    edges_done = true;
                    break;
                };
                let mut edge = edge?;
                needed.insert(edge.subject.clone());
                needed.insert(edge.object.clone());
                chunk.push(encode_edge(JsonFormat::Memgraph, &mut edge, next_id)?);
                next_id += 1;
            }

            if chunk.is_empty() {
                break;
            }

            let nodes = collect_nodes(nodes_in, &needed)?;
            let output = self.data_dir.join(format!(
                "{}-{}-{}.json",
                self.outfile,
                lines_per_file,
                report.files.len() + 1
            ));

            let mut out = JsonArrayWriter::create(&output)?;
            for node in &nodes {
                out.write_encoded(node)?;
            }
            for edge in &chunk {
                out.write_encoded(edge)?;
            }
            out.finish()?;

            tracing::debug!("{} node(s), {} edge(s) written to {:?}", nodes.len(), chunk.len(), output);
            report.nodes += nodes.len() as u64;
            report.edges += chunk.len() as u64;
            report.files.push(output);

            if edges_done || (output_file_count > 0 && report.files.len() == output_file_count) {
                break;
            }
        }

        tracing::info!(
            "Final stats: {} edge(s) and {} node(s) in {} file(s)",
            report.edges,
            report.nodes,
            report.files.len()
        );
        Ok(report)
    }

    /// Bulk load each produced file. `import_dir` replaces the local
    /// directory when Memgraph sees the files under a different path.
    pub fn load(
        &self,
        report: &MemgraphReport,
        import_dir: Option<&Path>,
        sink: &mut dyn StatementSink,
    ) -> Result<()> {
        for file in &report.files {
            let path = match (import_dir, file.file_name()) {
                (Some(dir), Some(name)) => dir.join(name),
                _ => file.clone(),
            };
            sink.execute(&memgraph::import_json(&path))?;
        }
        sink.finish()
    }
}

/// Encoded nodes whose id is in `needed`, each once, in file order.
/// Stops reading as soon as every needed node has been found.
fn collect_nodes(path: &Path, needed: &HashSet<String>) -> Result<Vec<String>> {
    let mut captured: HashSet<String> = HashSet::with_capacity(needed.len());
    let mut encoded = Vec::with_capacity(needed.len());

    for node in JsonLines::<NodeRecord>::open(path)? {
        if captured.len() == needed.len() {
            break;
        }
        let node = node?;
        if needed.contains(&node.id) && !captured.contains(&node.id) {
            encoded.push(encode_node(JsonFormat::Memgraph, &node)?);
            captured.insert(node.id);
        }
    }

    if captured.len() < needed.len() {
        tracing::warn!(
            "{} node(s) referenced by edges not found in {:?}",
            needed.len() - captured.len(),
            path
        );
    }
    Ok(encoded)
}
