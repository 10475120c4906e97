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

//! Generic abstraction to access different database systems.
//!
//! The facilities in this module provide an abstraction over different database systems such as
//! PostgreSQL and SQLite.  The PostgreSQL backend is for production use and the SQLite backend is
//! primarily intended to support unit tests.
//!
//! Services implement their persistence layer as free functions that take an `Executor` and
//! destructure it to issue the right query for each database.

use crate::model::ModelError;
use async_trait::async_trait;
#[cfg(any(feature = "postgres", feature = "sqlite"))]
use regex::Regex;
#[cfg(any(feature = "postgres", feature = "sqlite"))]
use std::sync::LazyLock;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Failures reported by the database layer.  Conditions the services react to get their own
/// variant and everything else lands in `BackendError`.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DbError {
    /// An insert collided with a unique key.
    #[error("Already exists")]
    AlreadyExists,

    /// Any other database failure.
    #[error("Database error: {0}")]
    BackendError(String),

    /// A stored row could not be turned back into a model type.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// The queried row, or a row referenced by a foreign key, does not exist.
    #[error("Entity not found")]
    NotFound,

    /// The database could not hand out a connection in time.
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// Handle on which to issue queries, either straight on a pooled connection or within a
/// transaction.
///
/// `sqlx` queries are typed by database, so callers match on the variant and write one query per
/// backend.
pub enum Executor {
    /// Production backend.
    #[cfg(feature = "postgres")]
    Postgres(postgres::PostgresExecutor),

    /// In-memory backend for tests.
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteExecutor),
}

/// An open transaction.  Changes made through `ex` are rolled back unless `commit` is called.
pub struct TxExecutor(Executor);

impl TxExecutor {
    /// Returns the executor to issue queries within this transaction.
    pub fn ex(&mut self) -> &mut Executor {
        &mut self.0
    }

    /// Makes the changes of this transaction permanent.
    pub async fn commit(self) -> DbResult<()> {
        match self.0 {
            #[cfg(feature = "postgres")]
            Executor::Postgres(e) => e.commit().await,

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(e) => e.commit().await,
        }
    }
}

/// Connection pool to one of the supported databases.
#[async_trait]
pub trait Db {
    /// Checks out an executor that is not part of any transaction.
    async fn ex(&self) -> DbResult<Executor>;

    /// Opens a transaction.  Dropping the result without calling `commit` rolls it back.
    async fn begin(&self) -> DbResult<TxExecutor>;

    /// Shuts down the pool once in-flight queries finish.
    async fn close(&self);
}

/// Matches SQL line comments.
#[cfg(any(feature = "postgres", feature = "sqlite"))]
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)--.*$").expect("Hardcoded regex must be valid"));

/// Splits a `schema` file into its individual statements, dropping comments and empty statements.
///
/// Statements are separated by semicolons, so the schema must not contain semicolons in string
/// literals or in comments that span more than one line.
#[cfg(any(feature = "postgres", feature = "sqlite"))]
pub(crate) fn split_schema(schema: &str) -> Vec<String> {
    COMMENT_RE
        .replace_all(schema, "")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Macros to help instantiate tests for multiple database systems.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    pub use paste::paste;

    /// Instantiates the `module::name` test for the database configured by `setup`.
    ///
    /// The `extra` metadata parameter can be used to tag the generated tests.
    #[macro_export]
    macro_rules! generate_one_test [
        ( $name:ident, $setup:expr, $module:path $(, #[$extra:meta] )? ) => {
            #[tokio::test]
            $(#[$extra])?
            async fn $name() {
                $crate::db::testutils::paste! {
                    $module :: [< $name >]($setup).await;
                }
            }
        }
    ];

    pub use generate_one_test;

    /// Instantiates a collection of tests for a specific database system.
    ///
    /// The database implementation to run the tests against is determined by the `setup`
    /// expression, which needs to return a database object that has already been initialized with
    /// the desired schema.
    ///
    /// The `extra` metadata parameter can be used to tag the generated tests.
    #[macro_export]
    macro_rules! generate_tests [
        ( #[$extra:meta], $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module, #[$extra]);
            )+
        };

        ( $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module);
            )+
        };
    ];

    pub use generate_tests;
}

#[cfg(test)]
mod split_tests {
    #[cfg(any(feature = "postgres", feature = "sqlite"))]
    #[test]
    fn test_split_schema() {
        let schema = "
            -- The users.
            CREATE TABLE a (x INTEGER);  -- Trailing comment; with a semicolon.

            CREATE TABLE b (
                y TEXT -- Inline.
            );
            ;
        ";
        let statements = super::split_schema(schema);
        assert_eq!(2, statements.len());
        assert_eq!("CREATE TABLE a (x INTEGER)", statements[0]);
        assert!(statements[1].starts_with("CREATE TABLE b ("));
        assert!(!statements[1].contains("Inline"));
    }
}
