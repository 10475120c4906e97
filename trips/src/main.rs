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

//! Entry point to the TripShare server.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use log::info;
use std::error::Error;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use tripshare_authn::driver::{AuthnDriver, AuthnOptions, TokenIssuer, TokenOptions};
use tripshare_core::clocks::SystemClock;
use tripshare_core::db::Db;
use tripshare_core::db::postgres::{PostgresDb, PostgresOptions};
use tripshare_core::env::get_optional_var;
use tripshare_geo::{
    CachingGeocoder, CachingGeocoderOptions, GoogleGeocoder, GoogleGeocoderOptions,
};
use tripshare_storage::{LocalStore, LocalStoreOptions, ObjectStore, S3Options, S3Store};
use tripshare_trips::driver::{TripsDriver, TripsOptions};
use tripshare_trips::{app, serve};

/// Default port to listen on when `API_PORT` is not set.
const DEFAULT_PORT: u16 = 5000;

/// Instantiates the object store selected by `TRIPSHARE_STORAGE`.
///
/// Returns the store and, for stores that keep files locally, the directory to serve them from.
fn setup_store() -> Result<(Arc<dyn ObjectStore + Send + Sync>, Option<PathBuf>), String> {
    match get_optional_var::<String>("TRIPSHARE", "STORAGE")?.as_deref() {
        None | Some("s3") => Ok((Arc::new(S3Store::new(S3Options::from_env("AWS")?)), None)),
        Some("local") => {
            let store = LocalStore::new(LocalStoreOptions::from_env("LOCAL_STORAGE")?);
            let dir = store.dir().clone();
            Ok((Arc::new(store), Some(dir)))
        }
        Some(other) => Err(format!("Unknown storage backend '{}' in TRIPSHARE_STORAGE", other)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let port = get_optional_var::<u16>("API", "PORT")?.unwrap_or(DEFAULT_PORT);
    let addr = (Ipv4Addr::UNSPECIFIED, port);

    let db_opts = PostgresOptions::from_env("PGSQL_PROD")?;
    let db: Arc<dyn Db + Send + Sync> = Arc::new(PostgresDb::connect(db_opts)?);
    tripshare_authn::db::init_schema(&mut db.ex().await?).await?;
    tripshare_trips::db::init_schema(&mut db.ex().await?).await?;

    let (store, uploads_dir) = setup_store()?;

    let geocoder = CachingGeocoder::new(
        CachingGeocoderOptions::from_env("GEOCODING_CACHE")?,
        GoogleGeocoder::new(GoogleGeocoderOptions::from_env("GOOGLE_GEOCODING")?),
    );

    let clock = Arc::new(SystemClock::default());
    let tokens = TokenIssuer::new(TokenOptions::from_env("JWT")?, clock);
    let authn =
        AuthnDriver::new(db.clone(), store.clone(), tokens, AuthnOptions::from_env("AUTHN")?);
    let trips = TripsDriver::new(db, store, Arc::new(geocoder), TripsOptions::from_env("TRIPS")?);

    let app = app(authn, trips, uploads_dir.as_deref());
    info!("TripShare API running on port {}", port);
    serve(addr, app).await
}
