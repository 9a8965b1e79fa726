// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Typed failure taxonomy for the library engine.
//!
//! Each stage of the pipeline (store, writer, indexer, query) has its own
//! error enum so callers can `match` on failure kind rather than parse a
//! string. Thread-worker boundaries still collapse these into
//! [`anyhow::Error`] the way the rest of this tree already does.

use std::path::PathBuf;

/// Failures opening or migrating the relational store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to switch database to WAL mode, current mode is {mode}")]
    WalModeRejected { mode: String },
    #[error("schema migration failed: {0}")]
    Migration(#[source] rusqlite::Error),
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
}

/// Failures raised while normalizing a tag bag into the relational schema.
#[derive(thiserror::Error, Debug)]
pub enum WriterError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A query violated a schema invariant (e.g. a unique constraint). Fatal
    /// to the current file's transaction, not to the scan session.
    #[error("schema violation while writing track: {0}")]
    SchemaViolation(#[source] rusqlite::Error),
    /// A SQL step failed for a reason other than a schema invariant.
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
    /// The thumbnail blob could not be written to disk.
    #[error("failed to write thumbnail blob at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The cooperative interrupt latch was observed mid-write.
    #[error("write interrupted")]
    Interrupted,
}

/// Failures raised while walking and indexing a set of roots.
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("reader produced no usable tags for {path}")]
    TagParse { path: PathBuf },
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("scan interrupted")]
    Interrupted,
}

/// Failures raised by the query layer.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
    /// A lookup by id or external id returned no rows, distinct from an
    /// empty result set for a listing query.
    #[error("no row found for {what}")]
    NotFound { what: String },
    /// An insert violated a uniqueness constraint; the caller reports and
    /// falls through rather than treating this as fatal.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<rusqlite::Error> for IndexError {
    fn from(e: rusqlite::Error) -> Self {
        IndexError::Store(StoreError::Sql(e))
    }
}

impl From<WriterError> for IndexError {
    fn from(e: WriterError) -> Self {
        match e {
            WriterError::Interrupted => IndexError::Interrupted,
            WriterError::Store(err) => IndexError::Store(err),
            WriterError::SchemaViolation(src) => IndexError::Store(StoreError::Sql(src)),
            WriterError::Sql(src) => IndexError::Store(StoreError::Sql(src)),
            WriterError::Io { path, source } => IndexError::Io { path, source },
        }
    }
}
