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

//! PostgreSQL backend for the `Db` abstraction, used by the production deployment.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor, split_schema};
use crate::env::{get_optional_var, get_required_var};
use async_trait::async_trait;
use derivative::Derivative;
use futures::Future;
use log::{debug, warn};
use sqlx::Transaction;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{
    PgConnectOptions, PgConnection, PgDatabaseError, PgPool, PgPoolOptions, Postgres,
};
use std::time::Duration;

/// How many times to wait for the database to come back if `<prefix>_MAX_RETRIES` is not set.
const DEFAULT_MAX_RETRIES: u16 = 60;

/// How long to wait for a connection from the pool before treating the database as unavailable.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound for the delay between two consecutive retries.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Converts a raw `sqlx` error `e` into a `DbError`, classifying the PostgreSQL error codes that
/// the services care about.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::Database(e) => {
            let code = e.downcast_ref::<PgDatabaseError>().code();
            match code {
                // foreign_key_violation: the referenced user or trip is gone.
                "23503" => DbError::NotFound,
                // unique_violation
                "23505" => DbError::AlreadyExists,
                // too_many_connections
                "53300" => DbError::Unavailable,
                _ => DbError::BackendError(format!("PostgreSQL error {}: {}", code, e)),
            }
        }
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        sqlx::Error::RowNotFound => DbError::NotFound,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Connection settings for a PostgreSQL server.
#[derive(Derivative)]
#[derivative(Debug, Default)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct PostgresOptions {
    /// Name or address of the server.
    pub host: String,

    /// TCP port the server listens on.
    pub port: u16,

    /// Name of the database holding the TripShare tables.
    pub database: String,

    /// Role to log in as.
    pub username: String,

    /// Password for `username`.  Never printed.
    #[derivative(Debug = "ignore")]
    pub password: String,

    /// Lower bound on the size of the connection pool, if any.
    pub min_connections: Option<u32>,

    /// Upper bound on the size of the connection pool, if any.
    pub max_connections: Option<u32>,

    /// How many times to wait for the database to become available before giving up.
    pub max_retries: u16,
}

impl PostgresOptions {
    /// Reads the connection settings from the `<prefix>_*` environment variables.
    ///
    /// `HOST`, `PORT`, `DATABASE`, `USERNAME` and `PASSWORD` are required.  `MIN_CONNECTIONS`,
    /// `MAX_CONNECTIONS` and `MAX_RETRIES` are optional.
    pub fn from_env(prefix: &str) -> Result<PostgresOptions, String> {
        let max_retries = get_optional_var::<u16>(prefix, "MAX_RETRIES")?;
        Ok(PostgresOptions {
            host: get_required_var(prefix, "HOST")?,
            port: get_required_var(prefix, "PORT")?,
            database: get_required_var(prefix, "DATABASE")?,
            username: get_required_var(prefix, "USERNAME")?,
            password: get_required_var(prefix, "PASSWORD")?,
            min_connections: get_optional_var(prefix, "MIN_CONNECTIONS")?,
            max_connections: get_optional_var(prefix, "MAX_CONNECTIONS")?,
            max_retries: max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        })
    }

    /// Builds the pool configuration described by these options.
    fn pool_options(&self) -> PgPoolOptions {
        let mut pool = PgPoolOptions::new().acquire_timeout(ACQUIRE_TIMEOUT);
        if let Some(n) = self.min_connections {
            pool = pool.min_connections(n);
        }
        if let Some(n) = self.max_connections {
            pool = pool.max_connections(n);
        }
        pool
    }

    /// Builds the per-connection configuration described by these options.
    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
    }
}

/// Executor for PostgreSQL queries.
#[derive(Debug)]
pub enum PostgresExecutor {
    /// Queries run on a connection checked out from the pool.
    Direct(PoolConnection<Postgres>),

    /// Queries run within an open transaction.
    Tx(Transaction<'static, Postgres>),
}

impl PostgresExecutor {
    /// Gives access to the connection to pass to `sqlx` queries.
    pub fn conn(&mut self) -> &mut PgConnection {
        match self {
            PostgresExecutor::Direct(conn) => &mut **conn,
            PostgresExecutor::Tx(tx) => &mut **tx,
        }
    }

    /// Commits the wrapped transaction.  Panics if this executor does not wrap one.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            PostgresExecutor::Direct(_) => unreachable!("Direct executors have nothing to commit"),
            PostgresExecutor::Tx(tx) => tx.commit().await.map_err(map_sqlx_error),
        }
    }
}

/// Sequence of growing, jittered delays to wait for between attempts to reach the database.
struct Backoff {
    /// Number of delays left to hand out.
    left: u16,

    /// Delay to hand out next.
    next: Duration,
}

impl Backoff {
    /// Creates a sequence that yields at most `attempts` delays.
    fn new(attempts: u16) -> Self {
        Self { left: attempts, next: Self::jitter(100, 900) }
    }

    /// Returns a random delay between `base` and `base + spread` milliseconds.
    fn jitter(base: u64, spread: u16) -> Duration {
        Duration::from_millis(base + u64::from(rand::random::<u16>() % spread))
    }

    /// Returns the delay to wait for before the next attempt, or `None` once exhausted.
    fn next_delay(&mut self) -> Option<Duration> {
        if self.left == 0 {
            return None;
        }
        self.left -= 1;

        let delay = self.next;
        if self.next < MAX_RETRY_DELAY {
            self.next += Self::jitter(0, 1000);
        }
        Some(delay)
    }
}

/// Runs `op` until it succeeds or fails with something other than unavailability, waiting
/// between attempts per `backoff`.
async fn with_retries<Op, OpFut, T>(mut backoff: Backoff, op: Op) -> DbResult<T>
where
    Op: Fn() -> OpFut,
    OpFut: Future<Output = Result<T, sqlx::Error>>,
{
    loop {
        match op().await.map_err(map_sqlx_error) {
            Err(DbError::Unavailable) => match backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        "PostgreSQL unavailable; retrying in {}ms ({} attempts left)",
                        delay.as_millis(),
                        backoff.left
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(DbError::Unavailable),
            },
            result => return result,
        }
    }
}

/// A pool of connections to a PostgreSQL database.
pub struct PostgresDb {
    /// Connections shared by all concurrent requests.
    pool: PgPool,

    /// How many times to wait for the database to become available before giving up.
    max_retries: u16,
}

impl Drop for PostgresDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("PostgresDb dropped while the pool was still open; call close() first");
        }
    }
}

impl PostgresDb {
    /// Sets up a pool configured with `opts`.  Connections are only opened on first use.
    pub fn connect(opts: PostgresOptions) -> DbResult<Self> {
        debug!("Configuring PostgreSQL pool for {:?}", opts);
        let pool = opts.pool_options().connect_lazy_with(opts.connect_options());
        Ok(Self { pool, max_retries: opts.max_retries })
    }

    /// Checks out a connection from the pool as a PostgreSQL-specific executor.
    pub async fn typed_ex(&self) -> DbResult<PostgresExecutor> {
        let conn = with_retries(Backoff::new(self.max_retries), || self.pool.acquire()).await?;
        Ok(PostgresExecutor::Direct(conn))
    }
}

#[async_trait]
impl Db for PostgresDb {
    async fn ex(&self) -> DbResult<Executor> {
        Ok(Executor::Postgres(self.typed_ex().await?))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = with_retries(Backoff::new(self.max_retries), || self.pool.begin()).await?;
        Ok(TxExecutor(Executor::Postgres(PostgresExecutor::Tx(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Applies every statement in `schema` using `ex`.
///
/// Schemas run on each startup so they must only contain `CREATE ... IF NOT EXISTS` statements.
pub async fn run_schema(ex: &mut PostgresExecutor, schema: &str) -> DbResult<()> {
    for statement in split_schema(schema) {
        sqlx::query(&statement).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    }
    Ok(())
}

/// Test utilities for the PostgreSQL backend.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Connects to the database described by the `PGSQL_TEST_*` variables.
    ///
    /// The pool is pinned to one connection whose `search_path` points at `pg_temp`, so every
    /// table a test creates vanishes when the pool closes.
    pub async fn setup() -> PostgresDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();

        let opts = PostgresOptions {
            min_connections: Some(1),
            max_connections: Some(1),
            ..PostgresOptions::from_env("PGSQL_TEST").unwrap()
        };
        let db = PostgresDb::connect(opts).unwrap();

        let mut ex = db.typed_ex().await.unwrap();
        sqlx::query("SET search_path TO pg_temp").execute(ex.conn()).await.unwrap();
        drop(ex);
        db
    }
}
