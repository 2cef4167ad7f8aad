//! Kuzu DDL and COPY statements

use std::path::Path;

use crate::partition::display_path;

/// Per-class node table
pub fn create_node_table(class: &str, columns_ddl: &str) -> String {
    format!("CREATE NODE TABLE {}({}, PRIMARY KEY (id))", class, columns_ddl)
}

/// Relationship table spanning every (subject class, object class) pair seen
/// for the predicate. Pairs are emitted in the order given.
pub fn create_rel_table<'a, I>(predicate: &str, pairs: I, columns_ddl: &str) -> String
where
    I: IntoIterator<Item = &'a (String, String)>,
{
    let from_to = pairs
        .into_iter()
        .map(|(from, to)| format!("FROM {} TO {}", from, to))
        .collect::<Vec<_>>()
        .join(",");

    format!("CREATE REL TABLE {}({}, {})", predicate, from_to, columns_ddl)
}

/// Node bulk copy; a bad row aborts the copy
pub fn copy_node_csv(class: &str, path: &Path) -> String {
    format!(
        r#"COPY {} FROM "{}" (HEADER=true, DELIMITER=",", IGNORE_ERRORS=false);"#,
        class,
        display_path(path)
    )
}

/// Edge bulk copy into one (from, to) pair of a multi-pair rel table.
/// Rows referencing missing nodes are skipped by the database.
pub fn copy_rel_csv(predicate: &str, path: &Path, from: &str, to: &str) -> String {
    format!(
        "COPY {} FROM '{}' (from='{}', to='{}',HEADER=true, DELIMITER=',', IGNORE_ERRORS=true);",
        predicate,
        display_path(path),
        from,
        to
    )
}

// Single-table JSON layout

pub const JSON_EXTENSION: &[&str] = &["INSTALL json;", "LOAD json;"];

pub const JSON_NODE_TABLE: &str = "CREATE NODE TABLE Node(\
id STRING PRIMARY KEY, \
labels STRING[], \
properties JSON, \
equivalent_identifiers STRING[])";

pub const JSON_EDGE_TABLE: &str = "CREATE REL TABLE Edge(\
FROM Node TO Node, \
label STRING, \
id INT64, \
properties JSON, \
knowledge_level STRING, \
agent_type STRING)";

pub fn copy_json(table: &str, path: &Path) -> String {
    format!("COPY {} FROM '{}';", table, display_path(path))
}
