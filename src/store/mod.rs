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

//! Thin relational persistence layer.
//!
//! [`Store`] owns the single SQLite connection, configures it for
//! single-writer/concurrent-reader use (WAL journaling, a sized page cache),
//! and exposes a statement cache and scoped transaction guards. All writer
//! mutations go through a [`TxGuard`] acquired here.

mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{CachedStatement, Connection, Savepoint, Transaction};

use crate::error::StoreError;

pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Opens (creating if necessary) the database at `path`, configures
    /// pragmas for the single-writer/concurrent-reader contract, and runs
    /// schema migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;

        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |r| r.get(0))
            .map_err(StoreError::Migration)?;
        if journal_mode != "wal" {
            return Err(StoreError::WalModeRejected { mode: journal_mode });
        }

        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA cache_size = -64000;",
        )
        .map_err(StoreError::Migration)?;

        conn.set_prepared_statement_cache_capacity(100);

        conn.execute_batch(schema::CREATE_SCHEMA)
            .map_err(StoreError::Migration)?;

        Ok(Self { conn, path })
    }

    /// Opens an in-memory database, primarily for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(StoreError::Migration)?;
        conn.execute_batch(schema::CREATE_SCHEMA)
            .map_err(StoreError::Migration)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// A statement-cache-backed prepared statement, reset rather than
    /// finalized between uses.
    pub fn cached(&self, sql: &str) -> Result<CachedStatement<'_>, StoreError> {
        Ok(self.conn.prepare_cached(sql)?)
    }

    pub fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    /// Acquires a scoped write transaction. Dropping the guard without
    /// calling [`TxGuard::commit`] rolls back.
    ///
    /// Only one root transaction can be outstanding at a time, which the
    /// borrow checker enforces by requiring `&mut self` here; nested scopes
    /// are acquired explicitly via [`TxGuard::savepoint`].
    pub fn transaction(&mut self) -> Result<TxGuard<'_>, StoreError> {
        let tx = self.conn.transaction()?;
        Ok(TxGuard {
            inner: TxInner::Root(tx),
        })
    }
}

enum TxInner<'conn> {
    Root(Transaction<'conn>),
    Nested(Savepoint<'conn>),
}

/// A scoped write transaction or savepoint. Commits on [`TxGuard::commit`];
/// rolls back on drop otherwise (the underlying `rusqlite` guard's default
/// behavior).
pub struct TxGuard<'conn> {
    inner: TxInner<'conn>,
}

impl<'conn> TxGuard<'conn> {
    pub fn connection(&self) -> &Connection {
        match &self.inner {
            TxInner::Root(tx) => tx,
            TxInner::Nested(sp) => sp,
        }
    }

    pub fn commit(self) -> Result<(), StoreError> {
        match self.inner {
            TxInner::Root(tx) => tx.commit()?,
            TxInner::Nested(sp) => sp.commit()?,
        }
        Ok(())
    }

    /// Acquires a nested transaction scope as a SQL `SAVEPOINT`. A failure
    /// in the nested scope rolls back only the nested work.
    pub fn savepoint(&mut self) -> Result<TxGuard<'_>, StoreError> {
        let sp = match &mut self.inner {
            TxInner::Root(tx) => tx.savepoint()?,
            TxInner::Nested(sp) => sp.savepoint()?,
        };
        Ok(TxGuard {
            inner: TxInner::Nested(sp),
        })
    }
}
