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

//! Database abstraction to manipulate trips.
//!
//! The owned-set of every user lives in the `authn` schema.  Operations that create or delete
//! trips must update it in the same transaction as the trip itself.

use crate::model::{Trip, TripContent};
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
use tripshare_core::model::{TripId, UserId};
use tripshare_geo::Coordinates;
use tripshare_storage::StorageKey;


/// Initializes the database schema.  The `authn` schema must have been initialized first.
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

/// Raw values of a `trips` row.
struct RawTrip {
    /// Value of the `id` column.
    id: String,

    /// Value of the `title` column.
    title: String,

    /// Value of the `description` column.
    description: String,

    /// Value of the `image` column.
    image: Option<String>,

    /// Value of the `address` column.
    address: String,

    /// Value of the `lat` column.
    lat: f64,

    /// Value of the `lng` column.
    lng: f64,

    /// Value of the `creator_id` column.
    creator_id: String,
}

impl TryFrom<RawTrip> for Trip {
    type Error = DbError;

    fn try_from(raw: RawTrip) -> DbResult<Self> {
        let image = match raw.image {
            Some(image) => Some(StorageKey::new(image)?),
            None => None,
        };
        Ok(Trip::new(
            TripId::parse(&raw.id)?,
            TripContent::new(raw.title, raw.description),
            image,
            raw.address,
            Coordinates { lat: raw.lat, lng: raw.lng },
            UserId::parse(&raw.creator_id)?,
        ))
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for RawTrip {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        Ok(Self {
            id: row.try_get("id").map_err(postgres::map_sqlx_error)?,
            title: row.try_get("title").map_err(postgres::map_sqlx_error)?,
            description: row.try_get("description").map_err(postgres::map_sqlx_error)?,
            image: row.try_get("image").map_err(postgres::map_sqlx_error)?,
            address: row.try_get("address").map_err(postgres::map_sqlx_error)?,
            lat: row.try_get("lat").map_err(postgres::map_sqlx_error)?,
            lng: row.try_get("lng").map_err(postgres::map_sqlx_error)?,
            creator_id: row.try_get("creator_id").map_err(postgres::map_sqlx_error)?,
        })
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for RawTrip {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        Ok(Self {
            id: row.try_get("id").map_err(sqlite::map_sqlx_error)?,
            title: row.try_get("title").map_err(sqlite::map_sqlx_error)?,
            description: row.try_get("description").map_err(sqlite::map_sqlx_error)?,
            image: row.try_get("image").map_err(sqlite::map_sqlx_error)?,
            address: row.try_get("address").map_err(sqlite::map_sqlx_error)?,
            lat: row.try_get("lat").map_err(sqlite::map_sqlx_error)?,
            lng: row.try_get("lng").map_err(sqlite::map_sqlx_error)?,
            creator_id: row.try_get("creator_id").map_err(sqlite::map_sqlx_error)?,
        })
    }
}

/// Creates a new `trip`.
///
/// Fails with `DbError::NotFound` if the creator of the trip does not exist.
pub async fn create_trip(ex: &mut Executor, trip: &Trip) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO trips
                    (id, title, description, image, address, lat, lng, creator_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";
            let done = sqlx::query(query_str)
                .bind(trip.id().to_string())
                .bind(trip.content().title())
                .bind(trip.content().description())
                .bind(trip.image().as_ref().map(StorageKey::as_str))
                .bind(trip.address())
                .bind(trip.coordinates().lat)
                .bind(trip.coordinates().lng)
                .bind(trip.creator_id().to_string())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO trips
                    (id, title, description, image, address, lat, lng, creator_id)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)";
            let done = sqlx::query(query_str)
                .bind(trip.id().to_string())
                .bind(trip.content().title())
                .bind(trip.content().description())
                .bind(trip.image().as_ref().map(StorageKey::as_str))
                .bind(trip.address())
                .bind(trip.coordinates().lat)
                .bind(trip.coordinates().lng)
                .bind(trip.creator_id().to_string())
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

/// Gets an existing trip.
pub async fn get_trip(ex: &mut Executor, trip_id: TripId) -> DbResult<Trip> {
    let raw = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM trips WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(trip_id.to_string())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            RawTrip::try_from(row)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM trips WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(trip_id.to_string())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            RawTrip::try_from(row)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Trip::try_from(raw)
}

/// Gets the trips in the owned-set of the user `user_id`, sorted by title.
///
/// Unknown users own no trips, so callers must check for the user's existence separately.
pub async fn get_trips_by_user(ex: &mut Executor, user_id: UserId) -> DbResult<Vec<Trip>> {
    let raws = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT trips.* FROM trips
                JOIN user_trips ON trips.id = user_trips.trip_id
                WHERE user_trips.user_id = $1
                ORDER BY trips.title, trips.id";
            let rows = sqlx::query(query_str)
                .bind(user_id.to_string())
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            let mut raws = Vec::with_capacity(rows.len());
            for row in rows {
                raws.push(RawTrip::try_from(row)?);
            }
            raws
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT trips.* FROM trips
                JOIN user_trips ON trips.id = user_trips.trip_id
                WHERE user_trips.user_id = ?
                ORDER BY trips.title, trips.id";
            let rows = sqlx::query(query_str)
                .bind(user_id.to_string())
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            let mut raws = Vec::with_capacity(rows.len());
            for row in rows {
                raws.push(RawTrip::try_from(row)?);
            }
            raws
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    raws.into_iter().map(Trip::try_from).collect()
}

/// Replaces the title and description of the trip `trip_id` with `content`.
pub async fn update_trip(
    ex: &mut Executor,
    trip_id: TripId,
    content: &TripContent,
) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "UPDATE trips SET title = $1, description = $2 WHERE id = $3";
            let done = sqlx::query(query_str)
                .bind(content.title())
                .bind(content.description())
                .bind(trip_id.to_string())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "UPDATE trips SET title = ?, description = ? WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(content.title())
                .bind(content.description())
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
        _ => Err(DbError::BackendError("Update affected more than one row".to_owned())),
    }
}

/// Deletes the trip `trip_id`.  Does not touch the owned-set of its creator.
pub async fn delete_trip(ex: &mut Executor, trip_id: TripId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "DELETE FROM trips WHERE id = $1";
            let done = sqlx::query(query_str)
                .bind(trip_id.to_string())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "DELETE FROM trips WHERE id = ?";
            let done = sqlx::query(query_str)
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
