//! Knowledge-graph interchange records

pub mod category;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{LoadError, Result};

pub use category::{class_name, CategoryPriority};

/// Which half of the graph a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    Node,
    Edge,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Node => "NODE",
            FileKind::Edge => "EDGE",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "NODE" => Ok(FileKind::Node),
            "EDGE" => Ok(FileKind::Edge),
            _ => Err(LoadError::UnsupportedFileKind(s.to_string())),
        }
    }
}

/// Node line from a JSONL export
///
/// ```json
/// {"id":"UNII:7PK6VC94OU","name":"4-Methylaminorex",
///  "category":["biolink:SmallMolecule","biolink:ChemicalEntity"],
///  "equivalent_identifiers":["UNII:7PK6VC94OU","MESH:C000081"]}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,

    #[serde(default, deserialize_with = "one_or_many")]
    pub category: Vec<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub equivalent_identifiers: Vec<String>,

    /// Every other property, untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeRecord {
    /// Whole record as a JSON object, the way it appeared in the export
    pub fn properties(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Edge line from a JSONL export
///
/// ```json
/// {"subject":"UNII:7PK6VC94OU","predicate":"biolink:affects","object":"NCBIGene:6531",
///  "primary_knowledge_source":"infores:ctd","publications":["PMID:30776375"],
///  "knowledge_level":"knowledge_assertion","agent_type":"manual_agent"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub subject: String,
    pub predicate: String,
    pub object: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EdgeRecord {
    pub fn properties(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Force `publications` into a list: missing/null → `[]`, scalar → `[x]`
    pub fn normalize_publications(&mut self) {
        let normalized = match self.extra.remove("publications") {
            None | Some(Value::Null) => Value::Array(Vec::new()),
            Some(Value::Array(items)) => Value::Array(items),
            Some(other) => Value::Array(vec![other]),
        };
        self.extra.insert("publications".to_string(), normalized);
    }

    /// Extra property as exported, if present
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Accept either `"x"` or `["x", "y"]`; null becomes empty
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
        OneOrMany::Null(()) => Vec::new(),
    })
}

/// Iterator over the records of a JSON-Lines file. Blank lines are skipped.
pub struct JsonLines<T> {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: u64,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonLines<T> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line_no: 0,
            _marker: PhantomData,
        })
    }
}

impl<T: DeserializeOwned> Iterator for JsonLines<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            return Some(serde_json::from_str(&line).map_err(|e| LoadError::InvalidRecord {
                path: self.path.clone(),
                line: self.line_no,
                message: e.to_string(),
            }));
        }
    }
}
