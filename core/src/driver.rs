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

//! Generic business logic for any service.
//!
//! Every service should implement its own `Driver` type.  The driver holds shared handles to the
//! database and to any external service (geocoder, object store) as trait objects, so that tests
//! can inject fakes:
//!
//! ```rust
//! use std::sync::Arc;
//! use tripshare_core::db::Db;
//!
//! #[derive(Clone)]
//! pub(crate) struct Driver {
//!     /// The database that the driver uses for persistence.
//!     db: Arc<dyn Db + Send + Sync>,
//!
//!     // ... other fields here ...
//! }
//! ```
//!
//! Every operation implemented in the `Driver` should consume `self` because this is the layer
//! that coordinates multiple operations against the database inside a single transaction.
//! Consuming `self` prevents the caller from easily issuing multiple operations against the driver,
//! as this would require a clone and highlight an undesirable pattern.

use crate::db::DbError;
use crate::model::ModelError;

/// Business logic errors.  These errors encompass backend and logical errors.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum DriverError {
    /// Indicates that the geocoding service could not resolve an address.
    #[error("Could not find coordinates for specified address.")]
    AddressNotFound,

    /// Catch-all error type for unexpected failures in the database or in external services.
    #[error("{0}")]
    BackendError(String),

    /// Indicates that a new account was requested for an email address that is already taken.
    #[error("Email address is already in use.")]
    EmailInUse,

    /// Indicates that a sign in attempt did not match any known email and password pair.
    #[error("Invalid credentials.")]
    InvalidCredentials,

    /// Indicates an error in the input data.
    #[error("{0}")]
    InvalidInput(String),

    /// Indicates that a requested entry does not exist or is not visible to the caller.
    #[error("{0}")]
    NotFound(String),

    /// Indicates that the caller's credentials could not be verified.
    #[error("{0}")]
    Unauthorized(String),
}

impl From<DbError> for DriverError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound => DriverError::NotFound(e.to_string()),
            DbError::AlreadyExists
            | DbError::BackendError(_)
            | DbError::DataIntegrityError(_)
            | DbError::Unavailable => DriverError::BackendError(e.to_string()),
        }
    }
}

impl From<ModelError> for DriverError {
    fn from(e: ModelError) -> Self {
        DriverError::InvalidInput(e.to_string())
    }
}

/// Result type for this module.
pub type DriverResult<T> = Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_db_error() {
        assert_eq!(
            DriverError::NotFound("Entity not found".to_owned()),
            DriverError::from(DbError::NotFound)
        );
        assert_eq!(
            DriverError::BackendError("Already exists".to_owned()),
            DriverError::from(DbError::AlreadyExists)
        );
        assert_eq!(
            DriverError::BackendError("Database error: boom".to_owned()),
            DriverError::from(DbError::BackendError("boom".to_owned()))
        );
    }

    #[test]
    fn test_fixed_messages() {
        assert_eq!(
            "Could not find coordinates for specified address.",
            DriverError::AddressNotFound.to_string()
        );
        assert_eq!("Email address is already in use.", DriverError::EmailInUse.to_string());
        assert_eq!("Invalid credentials.", DriverError::InvalidCredentials.to_string());
    }
}
