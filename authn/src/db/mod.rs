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

//! Database abstraction to manipulate users and their owned trips.

use crate::model::{HashedPassword, User};
use std::collections::{BTreeMap, BTreeSet};
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
#[cfg(feature = "postgres")]
use tripshare_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use tripshare_core::db::sqlite;
use tripshare_core::db::{DbError, DbResult, Executor};
use tripshare_core::model::{EmailAddress, TripId, UserId};
use tripshare_storage::StorageKey;

#[cfg(test)]
mod tests;

/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Builds a `User` from the raw values of a `users` row.  The user has no trips.
fn build_user(
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    image: Option<String>,
) -> DbResult<User> {
    let image = match image {
        Some(image) => Some(StorageKey::new(image)?),
        None => None,
    };
    Ok(User::new(
        UserId::parse(&id)?,
        first_name,
        last_name,
        EmailAddress::new(email)?,
        HashedPassword::new(password),
    )
    .with_image(image))
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for User {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: String = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let first_name: String = row.try_get("first_name").map_err(postgres::map_sqlx_error)?;
        let last_name: String = row.try_get("last_name").map_err(postgres::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(postgres::map_sqlx_error)?;
        let password: String = row.try_get("password").map_err(postgres::map_sqlx_error)?;
        let image: Option<String> = row.try_get("image").map_err(postgres::map_sqlx_error)?;

        build_user(id, first_name, last_name, email, password, image)
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for User {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: String = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let first_name: String = row.try_get("first_name").map_err(sqlite::map_sqlx_error)?;
        let last_name: String = row.try_get("last_name").map_err(sqlite::map_sqlx_error)?;
        let email: String = row.try_get("email").map_err(sqlite::map_sqlx_error)?;
        let password: String = row.try_get("password").map_err(sqlite::map_sqlx_error)?;
        let image: Option<String> = row.try_get("image").map_err(sqlite::map_sqlx_error)?;

        build_user(id, first_name, last_name, email, password, image)
    }
}

/// Creates a new `user`.  The trips of the user are ignored.
pub async fn create_user(ex: &mut Executor, user: &User) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO users (id, first_name, last_name, email, password, image)
                VALUES ($1, $2, $3, $4, $5, $6)";
            let done = sqlx::query(query_str)
                .bind(user.id().to_string())
                .bind(user.first_name())
                .bind(user.last_name())
                .bind(user.email().as_str())
                .bind(user.password().as_str())
                .bind(user.image().map(StorageKey::as_str))
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO users (id, first_name, last_name, email, password, image)
                VALUES (?, ?, ?, ?, ?, ?)";
            let done = sqlx::query(query_str)
                .bind(user.id().to_string())
                .bind(user.first_name())
                .bind(user.last_name())
                .bind(user.email().as_str())
                .bind(user.password().as_str())
                .bind(user.image().map(StorageKey::as_str))
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    if rows_affected != 1 {
        return Err(DbError::BackendError("Insertion affected more than one row".to_owned()));
    }
    Ok(())
}

/// Parses the raw `(user_id, trip_id)` pairs of the owned-sets into a map.
fn group_user_trips(
    raw: Vec<(String, String)>,
) -> DbResult<BTreeMap<UserId, BTreeSet<TripId>>> {
    let mut trips: BTreeMap<UserId, BTreeSet<TripId>> = BTreeMap::new();
    for (user_id, trip_id) in raw {
        trips.entry(UserId::parse(&user_id)?).or_default().insert(TripId::parse(&trip_id)?);
    }
    Ok(trips)
}

/// Gets the owned-set of the user `user_id`.  Unknown users have no trips.
async fn get_user_trips(ex: &mut Executor, user_id: UserId) -> DbResult<BTreeSet<TripId>> {
    let raw_trips: Vec<String> = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT trip_id FROM user_trips WHERE user_id = $1";
            let rows = sqlx::query(query_str)
                .bind(user_id.to_string())
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            let mut raw_trips = Vec::with_capacity(rows.len());
            for row in rows {
                raw_trips.push(row.try_get("trip_id").map_err(postgres::map_sqlx_error)?);
            }
            raw_trips
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT trip_id FROM user_trips WHERE user_id = ?";
            let rows = sqlx::query(query_str)
                .bind(user_id.to_string())
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            let mut raw_trips = Vec::with_capacity(rows.len());
            for row in rows {
                raw_trips.push(row.try_get("trip_id").map_err(sqlite::map_sqlx_error)?);
            }
            raw_trips
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    let mut trips = BTreeSet::new();
    for raw_trip in raw_trips {
        trips.insert(TripId::parse(&raw_trip)?);
    }
    Ok(trips)
}

/// Gets information about an existing user, including its owned-set.
pub async fn get_user_by_id(ex: &mut Executor, user_id: UserId) -> DbResult<User> {
    let user = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM users WHERE id = $1";
            let raw_user = sqlx::query(query_str)
                .bind(user_id.to_string())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            User::try_from(raw_user)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM users WHERE id = ?";
            let raw_user = sqlx::query(query_str)
                .bind(user_id.to_string())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            User::try_from(raw_user)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    let trips = get_user_trips(ex, user.id()).await?;
    Ok(user.with_trips(trips))
}

/// Gets information about the user with the given `email` address, including its owned-set.
pub async fn get_user_by_email(ex: &mut Executor, email: &EmailAddress) -> DbResult<User> {
    let user = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM users WHERE email = $1";
            let raw_user = sqlx::query(query_str)
                .bind(email.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            User::try_from(raw_user)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM users WHERE email = ?";
            let raw_user = sqlx::query(query_str)
                .bind(email.as_str())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            User::try_from(raw_user)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    let trips = get_user_trips(ex, user.id()).await?;
    Ok(user.with_trips(trips))
}

/// Gets all users sorted by email address, including their owned-sets.
pub async fn get_users(ex: &mut Executor) -> DbResult<Vec<User>> {
    let (users, raw_trips) = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM users ORDER BY email";
            let mut users = vec![];
            for row in sqlx::query(query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?
            {
                users.push(User::try_from(row)?);
            }

            let query_str = "SELECT user_id, trip_id FROM user_trips";
            let mut raw_trips = vec![];
            for row in sqlx::query(query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?
            {
                let user_id: String = row.try_get("user_id").map_err(postgres::map_sqlx_error)?;
                let trip_id: String = row.try_get("trip_id").map_err(postgres::map_sqlx_error)?;
                raw_trips.push((user_id, trip_id));
            }

            (users, raw_trips)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM users ORDER BY email";
            let mut users = vec![];
            for row in
                sqlx::query(query_str).fetch_all(ex.conn()).await.map_err(sqlite::map_sqlx_error)?
            {
                users.push(User::try_from(row)?);
            }

            let query_str = "SELECT user_id, trip_id FROM user_trips";
            let mut raw_trips = vec![];
            for row in
                sqlx::query(query_str).fetch_all(ex.conn()).await.map_err(sqlite::map_sqlx_error)?
            {
                let user_id: String = row.try_get("user_id").map_err(sqlite::map_sqlx_error)?;
                let trip_id: String = row.try_get("trip_id").map_err(sqlite::map_sqlx_error)?;
                raw_trips.push((user_id, trip_id));
            }

            (users, raw_trips)
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    let mut trips = group_user_trips(raw_trips)?;
    Ok(users
        .into_iter()
        .map(|user| {
            let user_trips = trips.remove(&user.id()).unwrap_or_default();
            user.with_trips(user_trips)
        })
        .collect())
}

/// Adds `trip_id` to the owned-set of the user `user_id`.
///
/// Fails with `DbError::NotFound` if the user does not exist.
pub async fn add_user_trip(ex: &mut Executor, user_id: UserId, trip_id: TripId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "INSERT INTO user_trips (user_id, trip_id) VALUES ($1, $2)";
            let done = sqlx::query(query_str)
                .bind(user_id.to_string())
                .bind(trip_id.to_string())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "INSERT INTO user_trips (user_id, trip_id) VALUES (?, ?)";
            let done = sqlx::query(query_str)
                .bind(user_id.to_string())
                .bind(trip_id.to_string())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    if rows_affected != 1 {
        return Err(DbError::BackendError("Insertion affected more than one row".to_owned()));
    }
    Ok(())
}

/// Removes `trip_id` from the owned-set of the user `user_id`.
pub async fn remove_user_trip(
    ex: &mut Executor,
    user_id: UserId,
    trip_id: TripId,
) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM user_trips WHERE user_id = $1 AND trip_id = $2";
            let done = sqlx::query(query_str)
                .bind(user_id.to_string())
                .bind(trip_id.to_string())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM user_trips WHERE user_id = ? AND trip_id = ?";
            let done = sqlx::query(query_str)
                .bind(user_id.to_string())
                .bind(trip_id.to_string())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Deletion affected more than one row".to_owned())),
    }
}
