//! JSON array output for the Kuzu JSON and Memgraph import paths
//!
//! Input is JSON-Lines; output is one JSON array per file, written
//! record by record so memory stays flat regardless of input size.
//! All non-ASCII characters are escaped (`é` → `\u00e9`).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;

use crate::error::Result;
use crate::model::{EdgeRecord, JsonLines, NodeRecord};

/// Compact formatter that escapes everything outside ASCII as `\uXXXX`
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if c.is_ascii() {
                continue;
            }
            writer.write_all(fragment[start..i].as_bytes())?;

            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{:04x}", unit)?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Serialize `value` through [`AsciiFormatter`]
pub fn write_ascii<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> Result<()> {
    let mut ser = serde_json::Serializer::with_formatter(writer, AsciiFormatter);
    value.serialize(&mut ser)?;
    Ok(())
}

pub fn to_ascii_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    write_ascii(&mut buf, value)?;
    // The formatter never emits non-ASCII bytes
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Streaming `[a,b,c]` writer
pub struct JsonArrayWriter<W: Write> {
    out: W,
    count: u64,
}

impl JsonArrayWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn new(mut out: W) -> Result<Self> {
        out.write_all(b"[")?;
        Ok(Self { out, count: 0 })
    }

    fn separator(&mut self) -> Result<()> {
        if self.count > 0 {
            self.out.write_all(b",")?;
        }
        self.count += 1;
        Ok(())
    }

    /// Append an element already encoded with [`to_ascii_string`]
    pub fn write_encoded(&mut self, encoded: &str) -> Result<()> {
        self.separator()?;
        self.out.write_all(encoded.as_bytes())?;
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Close the array and flush
    pub fn finish(mut self) -> Result<W> {
        self.out.write_all(b"]")?;
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Target layout of the emitted records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonFormat {
    Kuzu,
    Memgraph,
}

#[derive(Serialize)]
struct KuzuNode<'a> {
    id: &'a str,
    labels: &'a [String],
    equivalent_identifiers: &'a [String],
    properties: Value,
}

#[derive(Serialize)]
struct KuzuEdge<'a> {
    from: &'a str,
    to: &'a str,
    label: &'a str,
    id: u64,
    properties: Value,
    knowledge_level: Option<&'a Value>,
    agent_type: Option<&'a Value>,
}

#[derive(Serialize)]
struct MemgraphNode<'a> {
    id: &'a str,
    labels: &'a [String],
    #[serde(rename = "type")]
    kind: &'static str,
    properties: Value,
}

#[derive(Serialize)]
struct MemgraphEdge<'a> {
    start: &'a str,
    end: &'a str,
    label: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    id: u64,
    properties: Value,
}

/// Encode one node in `format`
pub fn encode_node(format: JsonFormat, node: &NodeRecord) -> Result<String> {
    let properties = node.properties()?;
    match format {
        JsonFormat::Kuzu => to_ascii_string(&KuzuNode {
            id: &node.id,
            labels: &node.category,
            equivalent_identifiers: &node.equivalent_identifiers,
            properties,
        }),
        JsonFormat::Memgraph => to_ascii_string(&MemgraphNode {
            id: &node.id,
            labels: &node.category,
            kind: "node",
            properties,
        }),
    }
}

/// Encode one edge in `format`. Kuzu edges get their publications
/// normalized to a list first.
pub fn encode_edge(format: JsonFormat, edge: &mut EdgeRecord, id: u64) -> Result<String> {
    match format {
        JsonFormat::Kuzu => {
            edge.normalize_publications();
            let properties = edge.properties()?;
            to_ascii_string(&KuzuEdge {
                from: &edge.subject,
                to: &edge.object,
                label: &edge.predicate,
                id,
                properties,
                knowledge_level: edge.get("knowledge_level"),
                agent_type: edge.get("agent_type"),
            })
        }
        JsonFormat::Memgraph => {
            let properties = edge.properties()?;
            to_ascii_string(&MemgraphEdge {
                start: &edge.subject,
                end: &edge.object,
                label: &edge.predicate,
                kind: "relationship",
                id,
                properties,
            })
        }
    }
}

fn under_limit(written: u64, max_items: Option<u64>) -> bool {
    max_items.map_or(true, |max| written < max)
}

/// Append every node of a JSONL file, returning how many were written
pub fn append_nodes<W: Write>(
    input: &Path,
    format: JsonFormat,
    out: &mut JsonArrayWriter<W>,
    max_items: Option<u64>,
) -> Result<u64> {
    let mut written = 0u64;
    for node in JsonLines::<NodeRecord>::open(input)? {
        if !under_limit(written, max_items) {
            break;
        }
        out.write_encoded(&encode_node(format, &node?)?)?;
        written += 1;
    }
    Ok(written)
}

/// Append every edge of a JSONL file. Ids are taken from `next_id`,
/// which is advanced past the last edge written.
pub fn append_edges<W: Write>(
    input: &Path,
    format: JsonFormat,
    out: &mut JsonArrayWriter<W>,
    max_items: Option<u64>,
    next_id: &mut u64,
) -> Result<u64> {
    let mut written = 0u64;
    for edge in JsonLines::<EdgeRecord>::open(input)? {
        if !under_limit(written, max_items) {
            break;
        }
        let mut edge = edge?;
        out.write_encoded(&encode_edge(format, &mut edge, *next_id)?)?;
        *next_id += 1;
        written += 1;
    }
    Ok(written)
}

/// Convert a node JSONL file into a JSON array file
pub fn convert_nodes(input: &Path, output: &Path, format: JsonFormat, max_items: Option<u64>) -> Result<u64> {
    tracing::debug!("Writing nodes from {:?} to {:?}", input, output);
    let mut out = JsonArrayWriter::create(output)?;
    let count = append_nodes(input, format, &mut out, max_items)?;
    out.finish()?;
    Ok(count)
}

/// Convert an edge JSONL file into a JSON array file, ids starting at 0
pub fn convert_edges(input: &Path, output: &Path, format: JsonFormat, max_items: Option<u64>) -> Result<u64> {
    tracing::debug!("Writing edges from {:?} to {:?}", input, output);
    let mut out = JsonArrayWriter::create(output)?;
    let mut next_id = 0;
    let count = append_edges(input, format, &mut out, max_items, &mut next_id)?;
    out.finish()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_ascii_escaping() {
        let s = to_ascii_string(&serde_json::json!({"name": "Sjögren 😀", "q": "a\"b"})).unwrap();
        assert_eq!(s, r#"{"name":"Sj\u00f6gren \ud83d\ude00","q":"a\"b"}"#);

        let back: Value = serde_json::from_str(&s).unwrap();
        assert_eq!(back["name"], "Sjögren 😀");
    }

    #[test]
    fn test_array_writer() {
        let mut w = JsonArrayWriter::new(Vec::new()).unwrap();
        assert_eq!(w.count(), 0);
        w.write_encoded("1").unwrap();
        w.write_encoded("{\"a\":2}").unwrap();
        assert_eq!(w.count(), 2);
        assert_eq!(w.finish().unwrap(), b"[1,{\"a\":2}]");

        let empty = JsonArrayWriter::new(Vec::new()).unwrap();
        assert_eq!(empty.finish().unwrap(), b"[]");
    }

    #[test]
    fn test_kuzu_node_and_edge_shapes() {
        let dir = TempDir::new().unwrap();
        let nodes = dir.path().join("nodes.jsonl");
        let edges = dir.path().join("edges.jsonl");
        fs::write(
            &nodes,
            "{\"id\":\"CHEBI:1\",\"name\":\"aspirin\",\"category\":[\"biolink:SmallMolecule\"],\"equivalent_identifiers\":[\"CHEBI:1\"]}\n",
        )
        .unwrap();
        fs::write(
            &edges,
            "{\"subject\":\"CHEBI:1\",\"predicate\":\"biolink:treats\",\"object\":\"MONDO:1\",\"publications\":\"PMID:1\",\"knowledge_level\":\"knowledge_assertion\"}\n\
             {\"subject\":\"CHEBI:1\",\"predicate\":\"biolink:affects\",\"object\":\"NCBIGene:1\"}\n",
        )
        .unwrap();

        let node_out = dir.path().join("out-nodes.json");
        assert_eq!(convert_nodes(&nodes, &node_out, JsonFormat::Kuzu, None).unwrap(), 1);
        let v = parse(&node_out);
        assert_eq!(v[0]["id"], "CHEBI:1");
        assert_eq!(v[0]["labels"], serde_json::json!(["biolink:SmallMolecule"]));
        assert_eq!(v[0]["equivalent_identifiers"], serde_json::json!(["CHEBI:1"]));
        assert_eq!(v[0]["properties"]["name"], "aspirin");

        let edge_out = dir.path().join("out-edges.json");
        assert_eq!(convert_edges(&edges, &edge_out, JsonFormat::Kuzu, None).unwrap(), 2);
        let v = parse(&edge_out);
        assert_eq!(v[0]["from"], "CHEBI:1");
        assert_eq!(v[0]["to"], "MONDO:1");
        assert_eq!(v[0]["label"], "biolink:treats");
        assert_eq!(v[0]["id"], 0);
        assert_eq!(v[0]["knowledge_level"], "knowledge_assertion");
        assert_eq!(v[0]["properties"]["publications"], serde_json::json!(["PMID:1"]));
        assert_eq!(v[1]["id"], 1);
        assert!(v[1]["agent_type"].is_null());
        assert_eq!(v[1]["properties"]["publications"], serde_json::json!([]));
    }

    #[test]
    fn test_memgraph_shapes_and_limit() {
        let dir = TempDir::new().unwrap();
        let edges = dir.path().join("edges.jsonl");
        fs::write(
            &edges,
            "{\"subject\":\"A\",\"predicate\":\"biolink:x\",\"object\":\"B\"}\n\
             {\"subject\":\"B\",\"predicate\":\"biolink:y\",\"object\":\"C\"}\n\
             {\"subject\":\"C\",\"predicate\":\"biolink:z\",\"object\":\"D\"}\n",
        )
        .unwrap();

        let out = dir.path().join("mg.json");
        assert_eq!(convert_edges(&edges, &out, JsonFormat::Memgraph, Some(2)).unwrap(), 2);
        let v = parse(&out);
        assert_eq!(v.as_array().unwrap().len(), 2);
        assert_eq!(v[0]["start"], "A");
        assert_eq!(v[0]["end"], "B");
        assert_eq!(v[0]["type"], "relationship");
        assert_eq!(v[1]["label"], "biolink:y");
        assert_eq!(v[1]["id"], 1);
        // Memgraph edges keep publications as exported
        assert!(v[0]["properties"].get("publications").is_none());
    }

    #[test]
    fn test_kuzu_edge_keeps_non_string_levels() {
        let mut edge: EdgeRecord = serde_json::from_str(
            r#"{"subject":"A","predicate":"biolink:x","object":"B","knowledge_level":["a","b"],"agent_type":3}"#,
        )
        .unwrap();
        let v: Value = serde_json::from_str(&encode_edge(JsonFormat::Kuzu, &mut edge, 7).unwrap()).unwrap();
        assert_eq!(v["knowledge_level"], serde_json::json!(["a", "b"]));
        assert_eq!(v["agent_type"], 3);
        assert_eq!(v["id"], 7);
    }

    #[test]
    fn test_memgraph_node() {
        let node: NodeRecord =
            serde_json::from_str(r#"{"id":"A:1","category":["biolink:Gene"]}"#).unwrap();
        let v: Value = serde_json::from_str(&encode_node(JsonFormat::Memgraph, &node).unwrap()).unwrap();
        assert_eq!(v["type"], "node");
        assert_eq!(v["labels"], serde_json::json!(["biolink:Gene"]));
        assert_eq!(v["properties"]["id"], "A:1");
    }
}
