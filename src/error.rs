//! Error types for the conversion pipeline

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoadError>;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileKind(String),

    #[error("Unknown pipeline stage: {0}")]
    UnknownStage(String),

    #[error("No data type recognised for column {column}: {type_name}")]
    UnknownColumnType { column: String, type_name: String },

    #[error("Header file {0:?} is empty")]
    EmptyHeader(PathBuf),

    #[error("Column {column} not found in {path:?}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("Invalid integer {value:?} in column {column} at {path:?} row {row}")]
    InvalidInt {
        value: String,
        column: String,
        path: PathBuf,
        row: u64,
    },

    #[error("Invalid record in {path:?} line {line}: {message}")]
    InvalidRecord {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("No {0} input file given")]
    MissingInput(&'static str),

    #[error("Lookup file not found: {0:?} (run the lookups stage first)")]
    MissingLookup(PathBuf),

    #[error("Statement failed: {statement}: {message}")]
    Statement { statement: String, message: String },

    #[error("Database error: {0}")]
    Database(String),
}
