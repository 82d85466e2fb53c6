//! Error types for the dataset store and codecs.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the persisted-table codecs.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a sable table file: {0}")]
    BadMagic(PathBuf),

    #[error("unsupported table file version {0}")]
    BadVersion(u8),

    #[error("table encoding failed: {0}")]
    Encode(postcard::Error),

    #[error("table decoding failed: {0}")]
    Decode(postcard::Error),

    #[error("malformed table content: {0}")]
    Malformed(String),
}

/// Errors from the library and dataset store.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("library path does not exist: {}", .0.display())]
    LibraryPathMissing(PathBuf),

    #[error("libref '{0}' is not defined")]
    UndefinedLibref(String),

    #[error("dataset {0} not found")]
    DatasetNotFound(String),

    #[error("library '{0}' is read-only")]
    ReadOnlyLibrary(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}
