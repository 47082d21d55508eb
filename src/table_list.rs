// ABOUTME: Ordered table list and its `<database>.list` sentinel file
// ABOUTME: Lets a run reuse a previously enumerated list instead of querying again

use crate::error::DumpError;
use crate::target::OutputLayout;
use crate::utils::{output_temp_file, validate_object_name};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Ordered, duplicate-free table names for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableList {
    tables: Vec<String>,
}

impl TableList {
    /// Build a list, rejecting duplicates and names that cannot become file names
    pub fn new(tables: Vec<String>) -> Result<Self, DumpError> {
        {
            let mut seen = HashSet::with_capacity(tables.len());
            for table in &tables {
                validate_object_name("table", table)?;
                if !seen.insert(table.as_str()) {
                    return Err(DumpError::InvalidList {
                        path: PathBuf::new(),
                        message: format!("table '{}' appears more than once", table),
                    });
                }
            }
        }

        Ok(Self { tables })
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Comma-separated rendering used when asking the operator to confirm
    pub fn inline(&self) -> String {
        self.tables.join(", ")
    }
}

/// Reads and writes `<root>/<database>.list`
#[derive(Debug, Clone)]
pub struct TableListStore {
    path: PathBuf,
}

impl TableListStore {
    pub fn new(layout: &OutputLayout) -> Self {
        Self {
            path: layout.list_path(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Write one name per line, replacing any previous list atomically
    pub fn save(&self, list: &TableList) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| DumpError::io("create directory", parent, e))?;

        let mut tmp = output_temp_file(parent)?;

        for table in list.iter() {
            writeln!(tmp, "{}", table).map_err(|e| DumpError::io("write", tmp.path(), e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| DumpError::io("sync", tmp.path(), e))?;

        tmp.persist(&self.path)
            .map_err(|e| DumpError::io("persist", &self.path, e.error))?;

        tracing::info!("Saved {} table(s) to {}", list.len(), self.path.display());
        Ok(())
    }

    /// Read the list back in file order; blank lines are skipped
    pub fn load(&self) -> Result<TableList> {
        let content =
            fs::read_to_string(&self.path).map_err(|e| DumpError::io("read", &self.path, e))?;

        let tables: Vec<String> = content
            .lines()
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();

        let list = TableList::new(tables)
            .map_err(|e| match e {
                DumpError::InvalidList { message, .. } => DumpError::InvalidList {
                    path: self.path.clone(),
                    message,
                },
                other => other,
            })
            .with_context(|| format!("Failed to load table list {}", self.path.display()))?;

        tracing::info!("Loaded {} table(s) from {}", list.len(), self.path.display());
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn list(names: &[&str]) -> TableList {
        TableList::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_table_list_rejects_duplicates() {
        let result = TableList::new(vec!["users".into(), "orders".into(), "users".into()]);
        assert!(matches!(result, Err(DumpError::InvalidList { .. })));
    }

    #[test]
    fn test_table_list_rejects_path_names() {
        let result = TableList::new(vec!["users".into(), "../../etc/passwd".into()]);
        assert!(matches!(result, Err(DumpError::InvalidName { .. })));
    }

    #[test]
    fn test_inline_rendering() {
        assert_eq!(list(&["users", "orders", "items"]).inline(), "users, orders, items");
        assert_eq!(list(&[]).inline(), "");
    }

    #[test]
    fn test_save_writes_one_name_per_line() {
        let dir = tempdir().unwrap();
        let store = TableListStore::new(&OutputLayout::new(dir.path(), "shop"));

        assert!(!store.exists());
        store.save(&list(&["users", "orders"])).unwrap();
        assert!(store.exists());

        let content = fs::read_to_string(dir.path().join("shop.list")).unwrap();
        assert_eq!(content, "users\norders\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_list_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = TableListStore::new(&OutputLayout::new(dir.path(), "shop"));
        store.save(&list(&["users"])).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_save_load_roundtrip_preserves_order() {
        let dir = tempdir().unwrap();
        let store = TableListStore::new(&OutputLayout::new(dir.path(), "shop"));

        let cases = vec![
            list(&[]),
            list(&["only"]),
            list(&["zeta", "alpha", "mid", "Beta", "order-items", "with space"]),
        ];

        for original in cases {
            store.save(&original).unwrap();
            assert_eq!(store.load().unwrap(), original);
        }
    }

    #[test]
    fn test_save_overwrites_existing_list() {
        let dir = tempdir().unwrap();
        let store = TableListStore::new(&OutputLayout::new(dir.path(), "shop"));

        store.save(&list(&["a", "b", "c", "d"])).unwrap();
        store.save(&list(&["x"])).unwrap();

        assert_eq!(store.load().unwrap(), list(&["x"]));
    }

    #[test]
    fn test_load_skips_blank_lines_and_carriage_returns() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "shop");
        fs::write(layout.list_path(), "users\r\n\norders\n   \n").unwrap();

        let loaded = TableListStore::new(&layout).load().unwrap();
        assert_eq!(loaded, list(&["users", "orders"]));
    }

    #[test]
    fn test_load_rejects_duplicate_entries_with_path() {
        let dir = tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "shop");
        fs::write(layout.list_path(), "users\norders\nusers\n").unwrap();

        let err = TableListStore::new(&layout).load().unwrap_err();
        match err.downcast_ref::<DumpError>() {
            Some(DumpError::InvalidList { path, .. }) => assert_eq!(path, &layout.list_path()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let store = TableListStore::new(&OutputLayout::new(dir.path(), "shop"));

        let err = store.load().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DumpError>(),
            Some(DumpError::Io { operation: "read", .. })
        ));
    }
}
