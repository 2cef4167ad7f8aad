//! Header parsing and database statement generation
//!
//! The exports ship a one-line, tab-delimited header file describing every
//! column as `name:type` (`id:ID`, `category:LABEL`, `p_value:float[]`, ...).
//! It is turned into the column list of the generated table definitions.

pub mod kuzu;
pub mod memgraph;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use regex_lite::Regex;

use crate::error::{LoadError, Result};
use crate::model::FileKind;

/// Database column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    String,
    Boolean,
    Float,
    Int64,
    FloatList,
    StringList,
}

impl ColumnType {
    /// Map an export type name. Identifier and relationship-type columns are strings.
    pub fn parse(type_name: &str) -> Option<Self> {
        match type_name {
            "START_ID" | "TYPE" | "END_ID" | "string" | "ID" => Some(ColumnType::String),
            "boolean" => Some(ColumnType::Boolean),
            "float" => Some(ColumnType::Float),
            "int" => Some(ColumnType::Int64),
            "float[]" => Some(ColumnType::FloatList),
            "string[]" | "LABEL" => Some(ColumnType::StringList),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "STRING",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Float => "FLOAT",
            ColumnType::Int64 => "INT64",
            ColumnType::FloatList => "FLOAT[]",
            ColumnType::StringList => "STRING[]",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column renamed by the conversion step: `category` → `labels` on nodes,
/// `predicate` → `label` on edges
pub fn renamed_column(kind: FileKind, name: &str) -> Option<&'static str> {
    match (kind, name) {
        (FileKind::Node, "category") => Some("labels"),
        (FileKind::Edge, "predicate") => Some("label"),
        _ => None,
    }
}

/// Replace every character outside `[A-Za-z0-9_]` with `_`
pub fn sanitize_name(name: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let re = INVALID.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]").expect("static pattern"));
    re.replace_all(name, "_").into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnSpec {
    /// Parse one `name:type` descriptor. The type is after the last `:`;
    /// everything before it is the (sanitized) name.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let descriptor = descriptor.trim();
        let (name, type_name) =
            descriptor
                .rsplit_once(':')
                .ok_or_else(|| LoadError::UnknownColumnType {
                    column: descriptor.to_string(),
                    type_name: String::new(),
                })?;

        let column_type =
            ColumnType::parse(type_name).ok_or_else(|| LoadError::UnknownColumnType {
                column: descriptor.to_string(),
                type_name: type_name.to_string(),
            })?;

        Ok(Self {
            name: sanitize_name(name),
            column_type,
        })
    }

    pub fn ddl(&self) -> String {
        format!("{} {}", self.name, self.column_type)
    }
}

/// Parsed header file for one side of the graph
#[derive(Debug, Clone)]
pub struct HeaderSchema {
    columns: Vec<ColumnSpec>,
}

impl HeaderSchema {
    pub fn parse(line: &str, kind: FileKind) -> Result<Self> {
        let mut columns = Vec::new();

        for descriptor in line.split('\t').filter(|d| !d.trim().is_empty()) {
            let mut column = ColumnSpec::parse(descriptor)?;
            if let Some(renamed) = renamed_column(kind, &column.name) {
                column.name = renamed.to_string();
            }
            columns.push(column);
        }

        Ok(Self { columns })
    }

    /// Read the first line of a header file; the rest of the file is ignored
    pub fn read<P: AsRef<Path>>(path: P, kind: FileKind) -> Result<Self> {
        let path = path.as_ref();
        let mut line = String::new();
        BufReader::new(File::open(path)?).read_line(&mut line)?;

        if line.trim().is_empty() {
            return Err(LoadError::EmptyHeader(path.to_path_buf()));
        }

        let schema = Self::parse(&line, kind)?;
        tracing::debug!(
            "Number of columns in {:?} to process: {}",
            path,
            schema.columns.len()
        );
        Ok(schema)
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// `name TYPE,name TYPE,...`
    pub fn ddl(&self) -> String {
        self.columns
            .iter()
            .map(ColumnSpec::ddl)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_column_types() {
        for (name, expected) in [
            ("ID", ColumnType::String),
            ("START_ID", ColumnType::String),
            ("END_ID", ColumnType::String),
            ("TYPE", ColumnType::String),
            ("string", ColumnType::String),
            ("boolean", ColumnType::Boolean),
            ("float", ColumnType::Float),
            ("int", ColumnType::Int64),
            ("float[]", ColumnType::FloatList),
            ("string[]", ColumnType::StringList),
            ("LABEL", ColumnType::StringList),
        ] {
            assert_eq!(ColumnType::parse(name), Some(expected), "{}", name);
        }
        assert_eq!(ColumnType::parse("date"), None);
    }

    #[test]
    fn test_column_spec_sanitizes_name() {
        let col = ColumnSpec::parse("CHEBI_ROLE_drug.role:string").unwrap();
        assert_eq!(col.name, "CHEBI_ROLE_drug_role");
        assert_eq!(col.ddl(), "CHEBI_ROLE_drug_role STRING");

        // Colons inside the name survive the split and are then sanitized
        let col = ColumnSpec::parse("biolink:thing:float[]\n").unwrap();
        assert_eq!(col.name, "biolink_thing");
        assert_eq!(col.column_type, ColumnType::FloatList);
    }

    #[test]
    fn test_unknown_type_is_error() {
        match ColumnSpec::parse("created:date") {
            Err(LoadError::UnknownColumnType { column, type_name }) => {
                assert_eq!(column, "created:date");
                assert_eq!(type_name, "date");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(ColumnSpec::parse("no_type").is_err());
    }

    #[test]
    fn test_node_header_renames_category_only() {
        let schema = HeaderSchema::parse(
            "id:ID\tcategory:LABEL\tname:string\tequivalent_identifiers:string[]\n",
            FileKind::Node,
        )
        .unwrap();

        assert_eq!(
            schema.ddl(),
            "id STRING,labels STRING[],name STRING,equivalent_identifiers STRING[]"
        );
    }

    #[test]
    fn test_edge_header_renames_exact_match() {
        let schema = HeaderSchema::parse(
            "subject:START_ID\tpredicate:TYPE\tobject:END_ID\tqualified_predicate:string\tp_value:float[]",
            FileKind::Edge,
        )
        .unwrap();

        assert_eq!(
            schema.ddl(),
            "subject STRING,label STRING,object STRING,qualified_predicate STRING,p_value FLOAT[]"
        );
        let names: Vec<&str> = schema.columns().iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"label"));
        assert!(!names.contains(&"predicate"));
    }

    #[test]
    fn test_read_first_line_only() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id:ID\tcategory:LABEL").unwrap();
        writeln!(file, "ignored:date").unwrap();

        let schema = HeaderSchema::read(file.path(), FileKind::Node).unwrap();
        assert_eq!(schema.columns().len(), 2);
        assert_eq!(schema.ddl(), "id STRING,labels STRING[]");
    }

    #[test]
    fn test_read_empty_header() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            HeaderSchema::read(file.path(), FileKind::Edge),
            Err(LoadError::EmptyHeader(_))
        ));
    }
}
