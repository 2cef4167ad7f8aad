//! kgload - batch converter and bulk loader for biomedical knowledge graphs
//!
//! # Architecture
//!
//! - **Convert**: partitioned CSV exports → database-ready CSV (`pt` → `conv`)
//! - **Lookups**: node id → class, predicate → class pairs (bincode on disk)
//! - **Bin**: one CSV per node class / edge triple (`conv` → `bin-`)
//! - **Tables / Import**: generated Kuzu DDL and COPY statements
//! - **JSON paths**: JSONL → Kuzu `Node`/`Edge` tables or Memgraph `import_util.json` arrays
//!
//! Statements go through a [`StatementSink`]: a script file, a database
//! shell, or (feature `kuzu`) an embedded database.
//!
//! # Usage example
//!
//! ```no_run
//! use kgload::{KuzuCsvPipeline, PipelineConfig, ScriptSink, Stage, StatementSink};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::default();
//! let pipeline = KuzuCsvPipeline::new(&config, "./robokop_data", "rk-nodes-pt", "rk-edges-pt", "rk-kuzu-db");
//!
//! pipeline.run(Stage::All, &mut |mode| {
//!     Ok(Box::new(ScriptSink::open("./robokop_data/rk-kuzu-db.cypher", mode)?) as Box<dyn StatementSink>)
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod binning;
pub mod config;
pub mod convert;
pub mod error;
pub mod loader;
pub mod lookup;
pub mod model;
pub mod partition;
pub mod pipeline;
pub mod schema;
pub mod timing;

pub use config::{ColumnRules, PartitionRange, PipelineConfig};
pub use error::{LoadError, Result};
pub use loader::{RecordingSink, ScriptSink, ShellSink, SinkMode, StatementSink};
pub use lookup::{EdgePredicateLookup, NodeClassLookup};
pub use model::{CategoryPriority, EdgeRecord, FileKind, NodeRecord};
pub use pipeline::{
    ImportReport, JsonLoadReport, KuzuCsvPipeline, KuzuJsonPipeline, MemgraphMode,
    MemgraphPipeline, MemgraphReport, Stage,
};

#[cfg(feature = "kuzu")]
pub use loader::KuzuSink;
