// TripShare
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! SQLite backend for the `Db` abstraction, used to run the services' tests in memory.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor, split_schema};
use async_trait::async_trait;
use log::warn;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Transaction;

/// Converts a raw `sqlx` error `e` into a `DbError`.
///
/// SQLite reports constraint violations only through the error message, so match on that.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::RowNotFound => DbError::NotFound,
        e if e.to_string().contains("FOREIGN KEY constraint failed") => DbError::NotFound,
        e if e.to_string().contains("UNIQUE constraint failed") => DbError::AlreadyExists,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Opens a new connection pool against the database at `conn_str`.
///
/// The pool holds a single connection that never expires so that in-memory databases, which only
/// live as long as their connection, keep their contents for the lifetime of the pool.  Callers
/// must therefore never hold more than one executor at a time.
pub async fn connect(conn_str: &str) -> DbResult<SqliteDb> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(conn_str)
        .await
        .map_err(map_sqlx_error)?;
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await.map_err(map_sqlx_error)?;
    Ok(SqliteDb { pool })
}

/// Executor for SQLite queries.
#[derive(Debug)]
pub enum SqliteExecutor {
    /// Queries run on the pool's connection.
    Direct(PoolConnection<Sqlite>),

    /// Queries run within an open transaction.
    Tx(Transaction<'static, Sqlite>),
}

impl SqliteExecutor {
    /// Gives access to the connection to pass to `sqlx` queries.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        match self {
            SqliteExecutor::Direct(conn) => &mut **conn,
            SqliteExecutor::Tx(tx) => &mut **tx,
        }
    }

    /// Commits the wrapped transaction.  Panics if this executor does not wrap one.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            SqliteExecutor::Direct(_) => unreachable!("Direct executors have nothing to commit"),
            SqliteExecutor::Tx(tx) => tx.commit().await.map_err(map_sqlx_error),
        }
    }
}

/// A single-connection SQLite database, typically in memory.
pub struct SqliteDb {
    /// Pool holding the one connection.
    pool: SqlitePool,
}

impl Drop for SqliteDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("SqliteDb dropped while the pool was still open; call close() first");
        }
    }
}

#[async_trait]
impl Db for SqliteDb {
    async fn ex(&self) -> DbResult<Executor> {
        let conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Ok(Executor::Sqlite(SqliteExecutor::Direct(conn)))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(TxExecutor(Executor::Sqlite(SqliteExecutor::Tx(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Applies every statement in `schema` using `ex`.
pub async fn run_schema(ex: &mut SqliteExecutor, schema: &str) -> DbResult<()> {
    for statement in split_schema(schema) {
        sqlx::query(&statement).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    }
    Ok(())
}

/// Test utilities for the SQLite backend.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Opens a fresh in-memory database.
    pub async fn setup() -> SqliteDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        connect(":memory:").await.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testutils::*;
    use super::*;
    use crate::db::tests::generate_db_rw_tests;

    generate_db_rw_tests!(Box::new(setup().await));

    /// Extracts the SQLite executor from a generic executor.
    fn typed(ex: &mut Executor) -> &mut SqliteExecutor {
        match ex {
            Executor::Sqlite(ex) => ex,
            #[allow(unreachable_patterns)]
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_map_sqlx_error_row_not_found() {
        assert_eq!(DbError::NotFound, map_sqlx_error(sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let db = setup().await;
        {
            let mut ex = db.ex().await.unwrap();
            let ex = typed(&mut ex);
            run_schema(
                ex,
                "CREATE TABLE parent (id INTEGER PRIMARY KEY);
                CREATE TABLE child (parent_id INTEGER REFERENCES parent (id));",
            )
            .await
            .unwrap();

            let err = sqlx::query("INSERT INTO child (parent_id) VALUES (5)")
                .execute(ex.conn())
                .await
                .map_err(map_sqlx_error)
                .unwrap_err();
            assert_eq!(DbError::NotFound, err);
        }
        db.close().await;
    }

    #[tokio::test]
    async fn test_unique_violation() {
        let db = setup().await;
        {
            let mut ex = db.ex().await.unwrap();
            let ex = typed(&mut ex);
            run_schema(ex, "CREATE TABLE t (email TEXT UNIQUE)").await.unwrap();

            let query = "INSERT INTO t (email) VALUES ('a@b.com')";
            sqlx::query(query).execute(ex.conn()).await.unwrap();
            let err =
                sqlx::query(query).execute(ex.conn()).await.map_err(map_sqlx_error).unwrap_err();
            assert_eq!(DbError::AlreadyExists, err);
        }
        db.close().await;
    }
}
