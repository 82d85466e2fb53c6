//! sable-data - Datasets, libraries and the Program Data Vector.
//!
//! The single table shape of the whole interpreter lives here: a dataset
//! is an ordered column catalog plus a vector of rows, each row an ordered
//! list of cells aligned to the catalog. A name-keyed view of a row exists
//! only transiently inside the [`Pdv`].
//!
//! Libraries bind a libref to a directory and cache loaded datasets; the
//! WORK library sits on a unique temp directory created at construction
//! and removed, best-effort, at shutdown. Persistence goes through the
//! [`codec::DatasetCodec`] trait; the default backend is a binary table
//! format, with CSV as the alternative.

pub mod codec;
pub mod dataset;
pub mod error;
pub mod library;
pub mod pdv;
pub mod value;
pub mod variable;

pub use codec::{BinaryTableCodec, CsvCodec, DatasetCodec};
pub use dataset::Dataset;
pub use error::{CodecError, DataError};
pub use library::{Access, Backend, Library, LibraryStore, WORK_LIBREF};
pub use pdv::{Pdv, PdvVar};
pub use value::{cmp_cells, cmp_key_tuples, Cell, MISSING};
pub use variable::{VarDef, VarKind};
