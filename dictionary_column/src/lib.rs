//! # Dictionary-encoded columns
//!
//! This crate stores a single table attribute compactly: each distinct value
//! is interned once in a [`Dictionary`] alongside the number of tuples
//! referencing it, while a position index maps every tuple id to its entry.
//! Point lookup stays O(1) and repeated values cost one reference each.
//!
//! [`DictionaryColumn`] owns both structures and is the only way to mutate
//! them. The [`Column`] trait erases the value type so a table can hold
//! heterogeneous columns behind one contract. Durability is a two-artifact
//! text encoding written by [`DictionaryColumn::store`] and read back by
//! [`DictionaryColumn::load`].
//!
//! Nothing here is thread-safe: the hosting system serializes all access,
//! typically under a table-level lock.

use std::path::PathBuf;

use data_types::{AttributeType, Tid};
use snafu::Snafu;

pub mod column;
pub mod dictionary;
pub mod facade;

pub use column::DictionaryColumn;
pub use dictionary::{Dictionary, EntryId};
pub use facade::{Column, ColumnValue};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("no value provided"))]
    NoValue,

    #[snafu(display("cannot insert {inserted} type into a column of {existing}"))]
    TypeMismatch {
        existing: AttributeType,
        inserted: AttributeType,
    },

    #[snafu(display("tuple id {tid} out of range for a column of {size} tuples"))]
    OutOfRange { tid: Tid, size: usize },

    #[snafu(display("unable to access {}: {source}", path.display()))]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("malformed line {line} in {}: {reason}", path.display()))]
    Format {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[snafu(display("cannot load into a column already holding {size} tuples"))]
    NotEmpty { size: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
