//! CSV partition conversion
//!
//! Rewrites each raw export partition into the shape the database's CSV
//! bulk copy expects:
//!
//! - edges get `from`/`to` columns (copies of `subject`/`object`) in front
//! - `category` → `labels` (nodes), `predicate` → `label` (edges)
//! - node labels are reordered so the preferred class comes first
//! - `;`-separated list cells become `[a,b,c]`
//! - float-typed integer cells (`3.0`) become `3`
//! - configured columns are dropped

pub mod json;

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::{ColumnRules, PipelineConfig};
use crate::error::{LoadError, Result};
use crate::model::category::LABEL_SEPARATOR;
use crate::model::{CategoryPriority, FileKind};
use crate::partition::PartitionFiles;
use crate::schema::renamed_column;
use crate::timing::StageTimer;

/// How one output cell is produced from an input record
#[derive(Debug, Clone)]
struct OutputColumn {
    name: String,
    source: usize,
    reorder_labels: bool,
    list: bool,
    int: bool,
}

/// Rewrites partitions of one kind
pub struct CsvConverter<'a> {
    kind: FileKind,
    rules: &'a ColumnRules,
    categories: &'a CategoryPriority,
}

impl<'a> CsvConverter<'a> {
    pub fn new(kind: FileKind, config: &'a PipelineConfig) -> Self {
        Self {
            kind,
            rules: config.columns(kind),
            categories: &config.categories,
        }
    }

    fn plan(&self, headers: &csv::StringRecord, path: &Path) -> Result<Vec<OutputColumn>> {
        let find = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| LoadError::MissingColumn {
                    column: name.to_string(),
                    path: path.to_path_buf(),
                })
        };

        let mut plan = Vec::with_capacity(headers.len() + 2);

        // Edge tables need the endpoints as the first two columns
        if self.kind == FileKind::Edge {
            for (name, source) in [("from", "subject"), ("to", "object")] {
                plan.push(OutputColumn {
                    name: name.to_string(),
                    source: find(source)?,
                    reorder_labels: false,
                    list: false,
                    int: false,
                });
            }
        }

        for (idx, header) in headers.iter().enumerate() {
            let name = renamed_column(self.kind, header).unwrap_or(header);
            if self.rules.drop.iter().any(|d| d == name) {
                continue;
            }

            plan.push(OutputColumn {
                name: name.to_string(),
                source: idx,
                reorder_labels: self.kind == FileKind::Node && name == "labels",
                list: self.rules.list.iter().any(|c| c == name),
                int: self.rules.int.iter().any(|c| c == name),
            });
        }

        Ok(plan)
    }

    /// Convert one partition, returning the number of data rows written
    pub fn convert_file(&self, input: &Path, output: &Path) -> Result<u64> {
        tracing::debug!("Converting file {:?} into {:?}", input, output);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(input)?;
        let headers = reader.headers()?.clone();
        let plan = self.plan(&headers, input)?;

        let mut writer = csv::Writer::from_path(output)?;
        writer.write_record(plan.iter().map(|c| c.name.as_str()))?;

        let mut record = csv::StringRecord::new();
        let mut out: Vec<String> = Vec::with_capacity(plan.len());
        let mut rows = 0u64;

        while reader.read_record(&mut record)? {
            out.clear();
            let row = record.position().map(|p| p.line()).unwrap_or(rows + 2);

            for column in &plan {
                let raw = record.get(column.source).unwrap_or("");
                out.push(self.convert_cell(column, raw, input, row)?);
            }

            writer.write_record(&out)?;
            rows += 1;
        }

        writer.flush()?;
        tracing::debug!("{} file {:?} converted and exported to {:?}", self.kind, input, output);
        Ok(rows)
    }

    fn convert_cell(&self, column: &OutputColumn, raw: &str, path: &Path, row: u64) -> Result<String> {
        if column.int {
            return format_int(raw).ok_or_else(|| LoadError::InvalidInt {
                value: raw.to_string(),
                column: column.name.clone(),
                path: path.to_path_buf(),
                row,
            });
        }

        let value = if column.reorder_labels && !raw.is_empty() {
            self.categories.reorder(raw)
        } else {
            raw.to_string()
        };

        if column.list {
            Ok(format_list(&value))
        } else {
            Ok(value)
        }
    }
}

/// `a;b'c` → `[a,b`c]`, empty → `[]`
pub fn format_list(cell: &str) -> String {
    if cell.is_empty() {
        return "[]".to_string();
    }

    let items: Vec<String> = cell
        .split(LABEL_SEPARATOR)
        .map(|item| item.replace('\'', "`"))
        .collect();
    format!("[{}]", items.join(","))
}

/// `3.0` → `3`, `-2` → `-2`, empty stays empty. Anything else, including
/// floats outside the `i64` range, is `None`.
pub fn format_int(cell: &str) -> Option<String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Some(String::new());
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Some(n.to_string());
    }

    let f = cell.parse::<f64>().ok()?;
    // i64::MAX rounds up to 2^63 as f64, so the upper bound is exclusive
    if !f.is_finite() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return None;
    }
    Some((f.trunc() as i64).to_string())
}

/// Per-stage summary
#[derive(Debug, Clone, Default)]
pub struct ConvertReport {
    pub files: Vec<(PathBuf, u64)>,
}

impl ConvertReport {
    pub fn total_rows(&self) -> u64 {
        self.files.iter().map(|(_, rows)| rows).sum()
    }
}

/// Convert every partition of `kind` in parallel
pub fn convert_partitions(
    config: &PipelineConfig,
    files: &PartitionFiles,
    kind: FileKind,
) -> Result<ConvertReport> {
    let _timer = StageTimer::start("convert", format!("{} DB files converted", kind));
    let converter = CsvConverter::new(kind, config);

    let files = files
        .conversions()
        .into_par_iter()
        .map(|(input, output)| {
            let rows = converter.convert_file(&input, &output)?;
            Ok((output, rows))
        })
        .collect::<Result<Vec<_>>>()?;

    let report = ConvertReport { files };
    tracing::info!(
        "Converted {} {} file(s), {} row(s)",
        report.files.len(),
        kind,
        report.total_rows()
    );
    Ok(report)
}
