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

//! Layered scaffolding shared by all TripShare services.
//!
//! Each service crate (`tripshare-authn`, `tripshare-trips`) is split into the same layers, from
//! the bottom up:
//!
//! 1.  `model`: Plain data types that can only be constructed in a valid state.  No I/O.
//!
//! 1.  `db`: Free functions that take an `Executor` and run one query per supported database.
//!
//! 1.  `driver`: The business rules.  A cloneable driver type owns the database pool and any
//!     external collaborators (object store, geocoder, clock) and orchestrates them.
//!
//! 1.  `rest`: One file per endpoint, each with an axum handler that validates its payload, calls
//!     the driver and maps the outcome to an HTTP response.
//!
//! 1.  `main`: Reads the environment, wires the layers together and serves the app.
//!
//! Each layer has its own error type (`ModelError`, `DbError`, `DriverError`, `RestError`) and
//! converts the one below it, so `?` carries failures up to the HTTP status code and message the
//! client sees.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

pub mod clocks;
pub mod db;
pub mod driver;
pub mod env;
pub mod model;
pub mod rest;
