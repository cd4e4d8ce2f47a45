use crate::adapters::storage::LocalStorage;
use crate::core::format::Format;
use crate::domain::model::{Catalog, Record};
use crate::domain::ports::{DecodeOptions, Storage, UnknownTagPolicy};
use crate::utils::error::{Result, StoreError};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

/// Holds a store's busy flag until dropped.
#[must_use = "the store is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Result<Self> {
        if flag.replace(true) {
            return Err(StoreError::Locked);
        }
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Persists a list of records to one file in one format.
///
/// Operations take `&self`; a second operation started while one is in progress
/// (or while a [`BusyGuard`] from [`RecordStore::lock`] is alive) fails with
/// [`StoreError::Locked`]. This guards against reentrancy only, not against other
/// threads or processes.
#[derive(Debug)]
pub struct RecordStore<S: Storage = LocalStorage> {
    storage: S,
    path: RefCell<PathBuf>,
    format: Cell<Format>,
    unknown_tags: Cell<UnknownTagPolicy>,
    busy: Cell<bool>,
}

impl RecordStore<LocalStorage> {
    pub fn new(format: Format, path: impl Into<PathBuf>) -> Self {
        Self::with_storage(LocalStorage, format, path)
    }
}

impl<S: Storage> RecordStore<S> {
    pub fn with_storage(storage: S, format: Format, path: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            path: RefCell::new(path.into()),
            format: Cell::new(format),
            unknown_tags: Cell::new(UnknownTagPolicy::default()),
            busy: Cell::new(false),
        }
    }

    pub fn unknown_tags(self, policy: UnknownTagPolicy) -> Self {
        self.unknown_tags.set(policy);
        self
    }

    pub fn path(&self) -> PathBuf {
        self.path.borrow().clone()
    }

    pub fn format(&self) -> Format {
        self.format.get()
    }

    pub fn unknown_tag_policy(&self) -> UnknownTagPolicy {
        self.unknown_tags.get()
    }

    pub fn is_locked(&self) -> bool {
        self.busy.get()
    }

    /// Marks the store busy for a multi-step caller operation.
    pub fn lock(&self) -> Result<BusyGuard<'_>> {
        BusyGuard::acquire(&self.busy).inspect_err(|_| {
            tracing::warn!(path = %self.path.borrow().display(), "store already locked");
        })
    }

    pub fn exists(&self) -> bool {
        self.storage.exists(&self.path.borrow())
    }

    /// Overwrites the file with `records`.
    pub fn save(&self, records: &[Record], catalog: &Catalog) -> Result<()> {
        let _guard = self.lock()?;
        let path = self.path();
        let format = self.format();

        tracing::debug!(path = %path.display(), %format, "saving {} records", records.len());
        let bytes = format.codec().encode(records, catalog)?;
        self.storage.write_file(&path, &bytes)?;
        tracing::debug!(path = %path.display(), "wrote {} bytes", bytes.len());
        Ok(())
    }

    /// Reads every record from the file, in file order.
    pub fn load(&self, catalog: &Catalog) -> Result<Vec<Record>> {
        let _guard = self.lock()?;
        let path = self.path();
        let format = self.format();

        tracing::debug!(path = %path.display(), %format, "loading records");
        let bytes = self.storage.read_file(&path)?;
        let options = DecodeOptions {
            unknown_tags: self.unknown_tags.get(),
        };
        let records = format.codec().decode(&bytes, catalog, options)?;
        tracing::debug!(path = %path.display(), "loaded {} records", records.len());
        Ok(records)
    }

    pub fn set_path(&self, new_path: impl AsRef<Path>) -> bool {
        let new_path = new_path.as_ref();
        if self.is_locked() || new_path.as_os_str().to_string_lossy().trim().is_empty() {
            return false;
        }
        *self.path.borrow_mut() = new_path.to_path_buf();
        true
    }

    pub fn set_format(&self, format: Format) -> bool {
        if self.is_locked() {
            return false;
        }
        self.format.set(format);
        true
    }

    /// Points the store at a new format and path pair. Nothing changes on failure.
    pub fn repoint(&self, format: Format, new_path: impl AsRef<Path>) -> bool {
        if !self.set_path(new_path) {
            return false;
        }
        self.format.set(format);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{FieldKind, Shape, Value};
    use std::collections::HashMap;

    /// In-memory storage that counts writes.
    #[derive(Default)]
    struct MockStorage {
        files: RefCell<HashMap<PathBuf, Vec<u8>>>,
        writes: Cell<usize>,
    }

    impl Storage for MockStorage {
        fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| StoreError::FileNotFound {
                    path: path.to_path_buf(),
                })
        }

        fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
            self.writes.set(self.writes.get() + 1);
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), data.to_vec());
            Ok(())
        }

        fn exists(&self, path: &Path) -> bool {
            self.files.borrow().contains_key(path)
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![Shape::new("t::Item").field("Name", FieldKind::Text)]).unwrap()
    }

    fn items() -> Vec<Record> {
        vec![Record::new("t::Item").with("Name", Value::Text("a".into()))]
    }

    #[test]
    fn test_save_then_load_in_memory() {
        let store = RecordStore::with_storage(MockStorage::default(), Format::Text, "items.txt");
        store.save(&items(), &catalog()).unwrap();
        assert_eq!(store.load(&catalog()).unwrap(), items());
        assert!(!store.is_locked());
    }

    #[test]
    fn test_guard_rejects_overlapping_calls() {
        let store = RecordStore::with_storage(MockStorage::default(), Format::Json, "items.json");
        let guard = store.lock().unwrap();

        assert!(matches!(store.save(&items(), &catalog()), Err(StoreError::Locked)));
        assert!(matches!(store.load(&catalog()), Err(StoreError::Locked)));
        assert!(matches!(store.lock(), Err(StoreError::Locked)));
        assert!(!store.set_path("other.json"));
        assert!(!store.set_format(Format::Xml));
        assert_eq!(store.storage.writes.get(), 0);

        drop(guard);
        assert!(store.save(&items(), &catalog()).is_ok());
    }

    #[test]
    fn test_flag_released_after_errors() {
        let store = RecordStore::with_storage(MockStorage::default(), Format::Json, "items.json");
        assert!(matches!(
            store.load(&catalog()),
            Err(StoreError::FileNotFound { .. })
        ));
        assert!(!store.is_locked());

        let bad = vec![Record::new("t::Unknown")];
        assert!(matches!(
            store.save(&bad, &catalog()),
            Err(StoreError::Encode { .. })
        ));
        assert!(!store.is_locked());
    }

    #[test]
    fn test_set_path_rejects_blank() {
        let store = RecordStore::new(Format::Text, "items.txt");
        assert!(!store.set_path(""));
        assert!(!store.set_path("   "));
        assert_eq!(store.path(), PathBuf::from("items.txt"));
        assert!(store.set_path("moved.txt"));
        assert_eq!(store.path(), PathBuf::from("moved.txt"));
    }

    #[test]
    fn test_repoint_changes_both_or_neither() {
        let store = RecordStore::new(Format::Text, "items.txt");
        assert!(!store.repoint(Format::Xml, ""));
        assert_eq!(store.format(), Format::Text);

        assert!(store.repoint(Format::Xml, "items.xml"));
        assert_eq!(store.format(), Format::Xml);
        assert_eq!(store.path(), PathBuf::from("items.xml"));
    }
}
