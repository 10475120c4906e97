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

//! In-memory cache of address lookups in front of another geocoder.

use crate::{Coordinates, GeoResult, Geocoder};
use async_trait::async_trait;
use derivative::Derivative;
use futures::lock::Mutex;
use log::{debug, warn};
use lru_time_cache::LruCache;
use std::sync::Arc;
use std::time::Duration;
use tripshare_core::env::get_optional_var;

/// How long a resolved address stays cached when `<prefix>_TTL` is not set.
const DEFAULT_TTL_SECONDS: u64 = 24 * 60 * 60;

/// How many addresses to remember when `<prefix>_CAPACITY` is not set.
const DEFAULT_CAPACITY: usize = 10 * 1024;

/// Options to configure a `CachingGeocoder`.
#[derive(Derivative)]
#[derivative(Debug)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct CachingGeocoderOptions {
    /// Time after which a cached address is looked up again.
    pub ttl: Duration,

    /// Number of addresses to remember before evicting the least recently used one.
    pub capacity: usize,
}

impl Default for CachingGeocoderOptions {
    fn default() -> Self {
        Self { ttl: Duration::from_secs(DEFAULT_TTL_SECONDS), capacity: DEFAULT_CAPACITY }
    }
}

impl CachingGeocoderOptions {
    /// Reads the optional `<prefix>_TTL` and `<prefix>_CAPACITY` variables.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let defaults = Self::default();
        Ok(Self {
            ttl: get_optional_var(prefix, "TTL")?.unwrap_or(defaults.ttl),
            capacity: get_optional_var(prefix, "CAPACITY")?.unwrap_or(defaults.capacity),
        })
    }
}

/// Geocoder that remembers successful lookups of a wrapped geocoder.
///
/// Failed lookups, including addresses that are not found, are never cached.
#[derive(Clone)]
pub struct CachingGeocoder<G> {
    /// Geocoder to query on cache misses.
    delegee: G,

    /// Coordinates of previously resolved addresses, keyed by the address as given.
    cache: Arc<Mutex<LruCache<String, Coordinates>>>,
}

impl<G> CachingGeocoder<G> {
    /// Puts a cache configured by `opts` in front of `delegee`.
    pub fn new(opts: CachingGeocoderOptions, delegee: G) -> Self {
        let cache = LruCache::with_expiry_duration_and_capacity(opts.ttl, opts.capacity);
        Self { delegee, cache: Arc::new(Mutex::new(cache)) }
    }
}

#[async_trait]
impl<G> Geocoder for CachingGeocoder<G>
where
    G: Geocoder + Send + Sync,
{
    async fn resolve(&self, address: &str) -> GeoResult<Coordinates> {
        if let Some(hit) = self.cache.lock().await.get(address).copied() {
            debug!("Geocoding cache hit for '{}'", address);
            return Ok(hit);
        }

        // The lock is not held across the lookup, so concurrent misses may both query upstream.
        let fresh = self.delegee.resolve(address).await?;
        let previous = self.cache.lock().await.insert(address.to_owned(), fresh);
        if let Some(previous) = previous.filter(|previous| *previous != fresh) {
            warn!("Concurrent lookups of '{}' disagree: {:?} vs {:?}", address, previous, fresh);
        }
        Ok(fresh)
    }
}
