//! Libraries and the library store.
//!
//! A library binds a libref to a directory and caches the datasets loaded
//! from it. The WORK library is implicit: it sits on a unique temp
//! directory created when the store is built and removed, best-effort,
//! at shutdown.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rustc_hash::FxHashMap;
use tempfile::TempDir;

use crate::codec::{BinaryTableCodec, CsvCodec, DatasetCodec};
use crate::dataset::Dataset;
use crate::error::DataError;

/// The implicit temporary libref.
pub const WORK_LIBREF: &str = "WORK";

/// Library access mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
    /// WORK: read-write, deleted at shutdown.
    Temporary,
}

/// Which persisted backend a library uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Binary,
    Csv,
}

impl Backend {
    fn codec(&self) -> Box<dyn DatasetCodec> {
        match self {
            Backend::Binary => Box::<BinaryTableCodec>::default(),
            Backend::Csv => Box::<CsvCodec>::default(),
        }
    }
}

/// A libref bound to a directory, with its dataset cache.
pub struct Library {
    /// Uppercased libref.
    pub libref: String,
    pub path: PathBuf,
    pub access: Access,
    pub backend: Backend,
    pub created: SystemTime,
    /// Loaded datasets, keyed by uppercased name.
    datasets: FxHashMap<String, Dataset>,
}

impl Library {
    fn new(libref: &str, path: PathBuf, access: Access, backend: Backend) -> Self {
        Self {
            libref: libref.to_ascii_uppercase(),
            path,
            access,
            backend,
            created: SystemTime::now(),
            datasets: FxHashMap::default(),
        }
    }

    /// On-disk path of a dataset in this library.
    fn dataset_path(&self, name: &str) -> PathBuf {
        let codec = self.backend.codec();
        self.path
            .join(format!("{}.{}", name.to_ascii_lowercase(), codec.extension()))
    }

    pub fn cached(&self, name: &str) -> Option<&Dataset> {
        self.datasets.get(&name.to_ascii_uppercase())
    }

    pub fn cached_mut(&mut self, name: &str) -> Option<&mut Dataset> {
        self.datasets.get_mut(&name.to_ascii_uppercase())
    }

    /// Insert or replace a dataset in the cache.
    pub fn insert(&mut self, dataset: Dataset) {
        self.datasets
            .insert(dataset.name.to_ascii_uppercase(), dataset);
    }

    /// Names of every cached dataset.
    pub fn cached_names(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }

    /// Load a dataset from disk into the cache. Returns false when no
    /// file exists for it.
    fn load_from_disk(&mut self, name: &str) -> Result<bool, DataError> {
        let path = self.dataset_path(name);
        if !path.exists() {
            return Ok(false);
        }
        let (catalog, rows) = self.backend.codec().load(&path)?;
        let mut dataset = Dataset::new(self.libref.clone(), name);
        dataset.catalog = catalog;
        dataset.rows = rows;
        log::debug!(
            "loaded {} ({} rows) from {}",
            dataset.display_name(),
            dataset.row_count(),
            path.display()
        );
        self.insert(dataset);
        Ok(true)
    }
}

/// All libraries of one interpreter session.
pub struct LibraryStore {
    /// Libraries keyed by uppercased libref.
    libs: FxHashMap<String, Library>,
    /// Keeps the WORK directory alive; dropping removes it.
    work_dir: Option<TempDir>,
}

impl LibraryStore {
    /// Build a store with the implicit WORK library on a fresh temp
    /// directory.
    pub fn new() -> Result<Self, DataError> {
        let work_dir = tempfile::Builder::new().prefix("sable_work_").tempdir()?;
        log::debug!("WORK library at {}", work_dir.path().display());

        let mut libs = FxHashMap::default();
        libs.insert(
            WORK_LIBREF.to_string(),
            Library::new(
                WORK_LIBREF,
                work_dir.path().to_path_buf(),
                Access::Temporary,
                Backend::Binary,
            ),
        );

        Ok(Self {
            libs,
            work_dir: Some(work_dir),
        })
    }

    /// Bind `libref` to `path`. The path must exist; any prior binding is
    /// replaced (its cache is dropped).
    pub fn define_library(
        &mut self,
        libref: &str,
        path: &Path,
        access: Access,
        backend: Backend,
    ) -> Result<(), DataError> {
        if !path.exists() {
            return Err(DataError::LibraryPathMissing(path.to_path_buf()));
        }
        let library = Library::new(libref, path.to_path_buf(), access, backend);
        self.libs.insert(library.libref.clone(), library);
        Ok(())
    }

    pub fn get_library(&self, libref: &str) -> Option<&Library> {
        self.libs.get(&libref.to_ascii_uppercase())
    }

    /// Drop a libref, invalidating every cached dataset under it.
    pub fn remove_library(&mut self, libref: &str) -> bool {
        self.libs.remove(&libref.to_ascii_uppercase()).is_some()
    }

    /// Open a dataset that must already exist (SET/MERGE/PROC input):
    /// from cache first, then from disk.
    pub fn open_dataset(
        &mut self,
        libref: Option<&str>,
        name: &str,
    ) -> Result<&mut Dataset, DataError> {
        let libref = libref.unwrap_or(WORK_LIBREF).to_ascii_uppercase();
        let display = format!("{}.{}", libref, name.to_ascii_uppercase());
        let library = self
            .libs
            .get_mut(&libref)
            .ok_or(DataError::UndefinedLibref(libref))?;

        if library.cached(name).is_none() && !library.load_from_disk(name)? {
            return Err(DataError::DatasetNotFound(display));
        }
        library
            .cached_mut(name)
            .ok_or(DataError::DatasetNotFound(display))
    }

    /// Get a dataset, creating an empty in-memory one bound to the
    /// library if neither the cache nor the disk has it.
    pub fn get_or_create_dataset(
        &mut self,
        libref: Option<&str>,
        name: &str,
    ) -> Result<&mut Dataset, DataError> {
        let libref = libref.unwrap_or(WORK_LIBREF).to_ascii_uppercase();
        let library = self
            .libs
            .get_mut(&libref)
            .ok_or_else(|| DataError::UndefinedLibref(libref.clone()))?;

        if library.cached(name).is_none() && !library.load_from_disk(name)? {
            library.insert(Dataset::new(libref.clone(), name));
        }
        library.cached_mut(name).ok_or_else(|| {
            DataError::DatasetNotFound(format!("{}.{}", libref, name.to_ascii_uppercase()))
        })
    }

    /// Replace a dataset in its library's cache (the staging-buffer swap
    /// at step end).
    pub fn put_dataset(&mut self, dataset: Dataset) -> Result<(), DataError> {
        let library = self
            .libs
            .get_mut(&dataset.libref)
            .ok_or_else(|| DataError::UndefinedLibref(dataset.libref.clone()))?;
        library.insert(dataset);
        Ok(())
    }

    /// Persist a dataset through its library's codec. Read-only libraries
    /// reject the write.
    pub fn save_dataset(&mut self, libref: Option<&str>, name: &str) -> Result<(), DataError> {
        let libref = libref.unwrap_or(WORK_LIBREF).to_ascii_uppercase();
        let library = self
            .libs
            .get_mut(&libref)
            .ok_or(DataError::UndefinedLibref(libref.clone()))?;
        if library.access == Access::ReadOnly {
            return Err(DataError::ReadOnlyLibrary(libref));
        }

        let display = format!("{}.{}", libref, name.to_ascii_uppercase());
        let path = library.dataset_path(name);
        let codec = library.backend.codec();
        let dataset = library
            .cached(name)
            .ok_or(DataError::DatasetNotFound(display))?;
        codec.save(&path, &dataset.catalog, &dataset.rows)?;
        log::debug!(
            "saved {} ({} rows) to {}",
            dataset.display_name(),
            dataset.row_count(),
            path.display()
        );
        Ok(())
    }

    /// Remove the WORK directory. Best-effort: failure is logged, never
    /// raised, since this runs on the shutdown path.
    pub fn shutdown(&mut self) {
        if let Some(work) = self.work_dir.take() {
            let path = work.path().to_path_buf();
            if let Err(err) = work.close() {
                log::warn!("failed to remove WORK directory {}: {err}", path.display());
            }
        }
        self.libs.clear();
    }
}

impl Drop for LibraryStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}
