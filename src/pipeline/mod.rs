//! End-to-end pipelines
//!
//! - [`KuzuCsvPipeline`]: partitioned CSV → per-class tables, run stage by stage
//! - [`KuzuJsonPipeline`]: JSONL → single `Node`/`Edge` tables via the JSON extension
//! - [`MemgraphPipeline`]: JSONL → `import_util.json` array files
//!
//! Pipelines never open a database themselves. Stages that need one ask
//! the caller for a [`StatementSink`], after any wipe of the database
//! directory has happened.

mod kuzu_csv;
mod kuzu_json;
mod memgraph;


use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::loader::{SinkMode, StatementSink};

pub use kuzu_csv::{ImportReport, KuzuCsvPipeline, Stage};
pub use kuzu_json::{JsonLoadReport, KuzuJsonPipeline};
pub use memgraph::{MemgraphMode, MemgraphPipeline, MemgraphReport};

/// Opens the sink a stage runs its statements through. Stages that just
/// wiped the database ask for [`SinkMode::Fresh`].
pub type SinkFactory<'a> = dyn FnMut(SinkMode) -> Result<Box<dyn StatementSink>> + 'a;

/// Remove an existing database (directory or single file). Absent is fine.
pub fn wipe_database(path: &Path) -> Result<()> {
    if path.is_dir() {
        tracing::info!("Removing existing database {:?}", path);
        fs::remove_dir_all(path)?;
    } else if path.is_file() {
        tracing::info!("Removing existing database file {:?}", path);
        fs::remove_file(path)?;
    }
    Ok(())
}
