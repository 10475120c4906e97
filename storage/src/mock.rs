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

//! Object store implementation backed by memory for testing purposes.

use crate::{ObjectStore, StorageError, StorageKey, StorageResult, Upload};
use async_trait::async_trait;
use bytes::Bytes;
use futures::lock::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Object store that keeps objects in memory and can be told to fail.
///
/// Clones share the same contents and failure settings.
#[derive(Clone, Default)]
pub struct MockObjectStore {
    /// Stored objects keyed by name.
    objects: Arc<Mutex<HashMap<StorageKey, Bytes>>>,

    /// Whether `put` calls fail.
    fail_puts: Arc<AtomicBool>,

    /// Whether `access_url` calls fail.
    fail_urls: Arc<AtomicBool>,

    /// Whether `delete` calls fail.
    fail_deletes: Arc<AtomicBool>,
}

impl MockObjectStore {
    /// Makes subsequent `put` calls fail if `fail` is true.
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent `access_url` calls fail if `fail` is true.
    pub fn set_fail_urls(&self, fail: bool) {
        self.fail_urls.store(fail, Ordering::SeqCst);
    }

    /// Makes subsequent `delete` calls fail if `fail` is true.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Returns true if an object named `key` is stored.
    pub async fn contains(&self, key: &StorageKey) -> bool {
        self.objects.lock().await.contains_key(key)
    }

    /// Returns the number of stored objects.
    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// Returns the contents of the object named `key`, if any.
    pub async fn get(&self, key: &StorageKey) -> Option<Bytes> {
        self.objects.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put(&self, upload: Upload) -> StorageResult<StorageKey> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("Injected put failure".to_owned()));
        }
        let key = StorageKey::generate(upload.image_type());
        let mut objects = self.objects.lock().await;
        let previous = objects.insert(key.clone(), upload.into_bytes());
        assert!(previous.is_none(), "Generated keys must be unique");
        Ok(key)
    }

    async fn access_url(&self, key: &StorageKey, ttl: Duration) -> StorageResult<String> {
        if self.fail_urls.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("Injected URL failure".to_owned()));
        }
        Ok(format!("https://storage.example.com/{}?ttl={}", key, ttl.as_secs()))
    }

    async fn delete(&self, key: &StorageKey) -> StorageResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("Injected delete failure".to_owned()));
        }
        match self.objects.lock().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::Backend(format!("No object named {}", key))),
        }
    }
}
