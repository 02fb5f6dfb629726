//! Persistent storage for document trees.
//!
//! Trees are stored as pretty-printed JSON in their canonical nested form.
//! Saving over an existing file keeps the previous version as `<file>.bak`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::tree::DocumentTree;

/// Write `tree` to `path`, backing up any existing file first.
pub fn write_tree(path: &Path, tree: &DocumentTree) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    if path.exists() {
        let backup = backup_path(path);
        fs::copy(path, &backup)?;
        debug!("Created backup at {}", backup.display());
    }

    fs::write(path, tree.to_json()?)?;
    info!(
        "Saved tree `{}` ({} sections) to {}",
        tree.doc_name(),
        tree.node_count(),
        path.display()
    );
    Ok(())
}

/// Read and validate a tree from `path`.
pub fn read_tree(path: &Path) -> Result<DocumentTree> {
    let json = fs::read_to_string(path)?;
    let tree = DocumentTree::from_json(&json)?;
    info!(
        "Loaded tree `{}` ({} sections) from {}",
        tree.doc_name(),
        tree.node_count(),
        path.display()
    );
    Ok(tree)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// A directory of trees, one file per document (`<doc_name>_tree.json`).
pub struct TreeStore {
    /// Base directory for storage.
    base_path: PathBuf,
}

impl TreeStore {
    /// Create a new tree store at the given path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the base path of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// File that holds the tree for `doc_name`.
    pub fn tree_path(&self, doc_name: &str) -> PathBuf {
        self.base_path.join(format!("{doc_name}_tree.json"))
    }

    /// Save `tree` under its own name and return the file written.
    pub fn save(&self, tree: &DocumentTree) -> Result<PathBuf> {
        let path = self.tree_path(tree.doc_name());
        write_tree(&path, tree)?;
        Ok(path)
    }

    pub fn load(&self, doc_name: &str) -> Result<DocumentTree> {
        read_tree(&self.tree_path(doc_name))
    }

    pub fn exists(&self, doc_name: &str) -> bool {
        self.tree_path(doc_name).exists()
    }

    /// Delete the stored tree and its backup.
    pub fn delete(&self, doc_name: &str) -> Result<()> {
        let path = self.tree_path(doc_name);
        for file in [backup_path(&path), path] {
            if file.exists() {
                fs::remove_file(&file)?;
            }
        }
        info!("Deleted stored tree `{doc_name}`");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{SectionRecord, TreeRecord, assign_ids};
    use pretty_assertions::assert_eq;

    fn tree(description: &str) -> DocumentTree {
        let mut structure = vec![
            SectionRecord::new("Scope")
                .with_text("## Scope\n")
                .with_children(vec![SectionRecord::new("Terms").with_text("### Terms\n")]),
        ];
        assign_ids(&mut structure);
        DocumentTree::from_record(TreeRecord {
            doc_name: "contract".to_string(),
            doc_description: description.to_string(),
            structure,
        })
        .unwrap()
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TreeStore::new(dir.path());

        let path = store.save(&tree("v1")).unwrap();

        assert_eq!(path, dir.path().join("contract_tree.json"));
        assert!(store.exists("contract"));
        assert_eq!(store.load("contract").unwrap(), tree("v1"));
    }

    #[test]
    fn test_overwrite_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = TreeStore::new(dir.path().join("nested"));

        store.save(&tree("v1")).unwrap();
        let path = store.save(&tree("v2")).unwrap();

        let backup = read_tree(&backup_path(&path)).unwrap();
        assert_eq!(backup.doc_description(), "v1");
        assert_eq!(read_tree(&path).unwrap().doc_description(), "v2");

        store.delete("contract").unwrap();
        assert!(!store.exists("contract"));
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(
            &path,
            r#"{"doc_name": "x", "structure": [{"title": "A", "node_id": "0002"}, {"title": "B", "node_id": "0001"}]}"#,
        )
        .unwrap();

        assert!(read_tree(&path).is_err());
    }
}
