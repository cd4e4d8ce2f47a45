use crate::domain::ports::Storage;
use crate::utils::error::{Result, StoreError};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for LocalStorage {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| StoreError::io(path, e))
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        fs::write(path, data).map_err(|e| StoreError::io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/data.txt");
        LocalStorage.write_file(&path, b"abc").unwrap();
        assert!(LocalStorage.exists(&path));
        assert_eq!(LocalStorage.read_file(&path).unwrap(), b"abc");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = LocalStorage
            .read_file(&dir.path().join("nope.json"))
            .unwrap_err();
        assert!(matches!(err, StoreError::FileNotFound { .. }));
    }
}
