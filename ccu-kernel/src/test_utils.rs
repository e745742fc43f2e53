/*!
Test Harness pour le kernel CCU

Facilite l'écriture de tests avec:
- un fichier data.csv isolé dans un dossier temporaire
- des stores instrumentés (compteur d'appels, échec d'écriture)
*/

use crate::models::{default_table, Table};
use crate::store::{CsvTableStore, StoreError, TableStore};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Init tracing pour les tests (idempotent)
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Dossier temporaire + store CSV pointant dessus
pub struct TestHarness {
    dir: TempDir,
    store: CsvTableStore,
}

impl TestHarness {
    pub fn new() -> Self {
        init_test_tracing();
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = CsvTableStore::new(dir.path().join("data.csv"));
        Self { dir, store }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_path(&self) -> PathBuf {
        self.store.path().to_path_buf()
    }

    pub fn store(&self) -> &CsvTableStore {
        &self.store
    }

    /// Store partageable (Arc<dyn TableStore>) sur le même fichier
    pub fn shared_store(&self) -> Arc<dyn TableStore> {
        Arc::new(self.store.clone())
    }

    pub fn read_data_file(&self) -> String {
        fs::read_to_string(self.store.path()).expect("read data file")
    }

    pub fn write_data_file(&self, content: &str) {
        fs::write(self.store.path(), content).expect("write data file");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Store qui compte les appels à load() / save() avant de déléguer
pub struct CountingStore<S> {
    inner: S,
    loads: AtomicUsize,
    saves: AtomicUsize,
}

impl<S: TableStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            loads: AtomicUsize::new(0),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl<S: TableStore> TableStore for CountingStore<S> {
    fn load(&self) -> Result<Table, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load()
    }

    fn save(&self, table: &Table) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(table)
    }
}

/// Store dont la lecture renvoie les valeurs par défaut et l'écriture échoue toujours
pub struct ReadOnlyStore;

impl TableStore for ReadOnlyStore {
    fn load(&self) -> Result<Table, StoreError> {
        Ok(default_table())
    }

    fn save(&self, _table: &Table) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only store",
        )))
    }
}
