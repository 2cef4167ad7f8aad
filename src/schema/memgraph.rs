//! Memgraph import statements

use std::path::Path;

use crate::partition::display_path;

/// `import_util.json` bulk import of a node/relationship JSON array file.
/// The path is resolved on the Memgraph server.
pub fn import_json(path: &Path) -> String {
    format!(r#"CALL import_util.json("{}");"#, display_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_json() {
        assert_eq!(
            import_json(Path::new("/var/lib/memgraph/merge.json")),
            r#"CALL import_util.json("/var/lib/memgraph/merge.json");"#
        );
    }
}
