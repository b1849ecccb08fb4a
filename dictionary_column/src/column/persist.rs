//! Durable encoding of a dictionary column as two companion text artifacts.
//!
//! `store(path)` writes `<path>_values` (one `<refcount> <value>` line per
//! distinct entry, in dictionary iteration order) and `<path>_position` (one
//! values-line ordinal per tuple, in tuple order). `load(path)` rebuilds the
//! column from the same pair. The layout is a stable round-trip format.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use snafu::{ensure, OptionExt, ResultExt};
use tracing::debug;

use super::DictionaryColumn;
use crate::{FormatSnafu, IoSnafu, NotEmptySnafu, Result};

const VALUES_SUFFIX: &str = "_values";
const POSITION_SUFFIX: &str = "_position";

/// Appends an artifact suffix to the caller-supplied path.
fn artifact_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

impl<T> DictionaryColumn<T>
where
    T: Clone + Ord + fmt::Display + FromStr,
    <T as FromStr>::Err: fmt::Display,
{
    /// Writes the column to `<path>_values` and `<path>_position`.
    ///
    /// Value text must round-trip exactly through `Display`/`FromStr`;
    /// values containing line breaks are unsupported by this framing.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let values_path = artifact_path(path, VALUES_SUFFIX);
        let file = File::create(&values_path).context(IoSnafu { path: &values_path })?;
        let mut out = BufWriter::new(file);

        // Entries land in dictionary iteration order; the positions artifact
        // references them by line ordinal.
        let mut line_of = BTreeMap::new();
        for (line, (id, value, refcount)) in self.dictionary.iter().enumerate() {
            writeln!(out, "{refcount} {value}").context(IoSnafu { path: &values_path })?;
            line_of.insert(id, line);
        }
        out.flush().context(IoSnafu { path: &values_path })?;

        let position_path = artifact_path(path, POSITION_SUFFIX);
        let file = File::create(&position_path).context(IoSnafu {
            path: &position_path,
        })?;
        let mut out = BufWriter::new(file);
        for id in &self.positions {
            let line = line_of
                .get(id)
                .expect("every referenced entry was just written");
            writeln!(out, "{line}").context(IoSnafu {
                path: &position_path,
            })?;
        }
        out.flush().context(IoSnafu {
            path: &position_path,
        })?;

        debug!(
            column = self.name.as_str(),
            entries = line_of.len(),
            tuples = self.positions.len(),
            "stored dictionary column"
        );
        Ok(())
    }

    /// Rebuilds the column from the artifacts written by
    /// [`store`](Self::store). Only valid on an empty column; refcounts are
    /// trusted as written, not recomputed.
    ///
    /// A failed load leaves the column partially populated and unusable:
    /// discard the instance rather than continuing with it.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        ensure!(self.size() == 0, NotEmptySnafu { size: self.size() });
        let path = path.as_ref();

        let values_path = artifact_path(path, VALUES_SUFFIX);
        let file = File::open(&values_path).context(IoSnafu { path: &values_path })?;

        // Entry handles in file order, the ordinal space the positions
        // artifact references.
        let mut entries = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.context(IoSnafu { path: &values_path })?;
            let (refcount, text) = line.split_once(' ').context(FormatSnafu {
                path: &values_path,
                line: idx + 1,
                reason: "expected `<refcount> <value>`",
            })?;
            let refcount: u64 = refcount.parse().ok().context(FormatSnafu {
                path: &values_path,
                line: idx + 1,
                reason: "refcount is not an integer",
            })?;
            ensure!(
                refcount >= 1,
                FormatSnafu {
                    path: &values_path,
                    line: idx + 1,
                    reason: "refcount must be at least one",
                }
            );
            let value = text.parse::<T>().map_err(|e| {
                FormatSnafu {
                    path: &values_path,
                    line: idx + 1,
                    reason: format!("unparseable value: {e}"),
                }
                .build()
            })?;
            let id = self
                .dictionary
                .insert_new(value, refcount)
                .context(FormatSnafu {
                    path: &values_path,
                    line: idx + 1,
                    reason: "duplicate dictionary value",
                })?;
            entries.push(id);
        }

        let position_path = artifact_path(path, POSITION_SUFFIX);
        let file = File::open(&position_path).context(IoSnafu {
            path: &position_path,
        })?;
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.context(IoSnafu {
                path: &position_path,
            })?;
            let ordinal: usize = line.trim().parse().ok().context(FormatSnafu {
                path: &position_path,
                line: idx + 1,
                reason: "position is not an integer",
            })?;
            let id = entries.get(ordinal).copied().context(FormatSnafu {
                path: &position_path,
                line: idx + 1,
                reason: "position references a missing values line",
            })?;
            self.positions.push(id);
        }

        debug!(
            column = self.name.as_str(),
            entries = entries.len(),
            tuples = self.positions.len(),
            "loaded dictionary column"
        );
        Ok(())
    }
}
