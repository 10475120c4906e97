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

//! Object storage for uploaded images.
//!
//! Uploads are validated before they reach any backend: only PNG and JPEG images up to
//! `MAX_UPLOAD_BYTES` are accepted.  Backends generate the key of every stored object from a
//! random identifier and never from client-supplied file names.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use async_trait::async_trait;
use bytes::Bytes;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tripshare_core::driver::DriverError;
use tripshare_core::model::{ModelError, ModelResult};
use uuid::Uuid;

mod local;
pub use local::{LocalStore, LocalStoreOptions};
#[cfg(any(test, feature = "testutils"))]
mod mock;
#[cfg(any(test, feature = "testutils"))]
pub use mock::MockObjectStore;
mod s3;
pub use s3::{S3Options, S3Store};

/// Maximum size of an upload in bytes.
pub const MAX_UPLOAD_BYTES: usize = 500_000;

/// Object storage errors.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum StorageError {
    /// Indicates that an upload is of a type other than the supported images.
    #[error("Unsupported image type '{0}'")]
    InvalidMimeType(String),

    /// Indicates that an upload exceeds `MAX_UPLOAD_BYTES`.
    #[error("Upload of {0} bytes exceeds the maximum of {MAX_UPLOAD_BYTES} bytes")]
    TooLarge(usize),

    /// Catch-all error type for failures in the storage backend.
    #[error("Object storage failure: {0}")]
    Backend(String),
}

impl From<StorageError> for DriverError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidMimeType(_) | StorageError::TooLarge(_) => {
                DriverError::InvalidInput(e.to_string())
            }
            StorageError::Backend(_) => DriverError::BackendError(e.to_string()),
        }
    }
}

/// Result type for this module.
pub type StorageResult<T> = Result<T, StorageError>;

/// Supported image formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageType {
    /// A PNG image.
    Png,

    /// A JPEG image declared as `image/jpg`.
    Jpg,

    /// A JPEG image declared as `image/jpeg`.
    Jpeg,
}

impl ImageType {
    /// Determines the image type from a declared MIME type, if supported.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(ImageType::Png),
            "image/jpg" => Some(ImageType::Jpg),
            "image/jpeg" => Some(ImageType::Jpeg),
            _ => None,
        }
    }

    /// Returns the file extension to use for objects of this type.
    pub fn extension(self) -> &'static str {
        match self {
            ImageType::Png => "png",
            ImageType::Jpg => "jpg",
            ImageType::Jpeg => "jpeg",
        }
    }

    /// Returns the MIME type to store objects of this type with.
    pub fn mime(self) -> &'static str {
        match self {
            ImageType::Png => "image/png",
            ImageType::Jpg => "image/jpg",
            ImageType::Jpeg => "image/jpeg",
        }
    }
}

/// An image received from a client that passed validation.
#[derive(Debug)]
pub struct Upload {
    /// Contents of the image.
    bytes: Bytes,

    /// Format of the image.
    image_type: ImageType,
}

impl Upload {
    /// Validates `bytes` declared by the client to be of type `mime`.
    pub fn new(bytes: Bytes, mime: &str) -> StorageResult<Self> {
        let image_type = match ImageType::from_mime(mime) {
            Some(image_type) => image_type,
            None => return Err(StorageError::InvalidMimeType(mime.to_owned())),
        };
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(StorageError::TooLarge(bytes.len()));
        }
        Ok(Self { bytes, image_type })
    }

    /// Returns the format of the image.
    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    /// Returns the size of the image in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the image has no contents.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consumes the upload and returns its contents.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Name of an object in the store.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageKey(String);

impl StorageKey {
    /// Creates a key from a stored name after validating that it cannot escape its container.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        if s.is_empty() {
            return Err(ModelError("Storage key cannot be empty".to_owned()));
        }
        if s.contains('/') || s.contains('\\') || s.contains("..") {
            return Err(ModelError(format!("Invalid storage key '{}'", s)));
        }
        Ok(Self(s))
    }

    /// Generates a new unique key for an object of type `image_type`.
    pub fn generate(image_type: ImageType) -> Self {
        Self(format!("{}.{}", Uuid::new_v4(), image_type.extension()))
    }

    /// Returns a string view of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StorageKey {
    type Error = ModelError;

    fn try_from(s: String) -> ModelResult<Self> {
        StorageKey::new(s)
    }
}

impl From<StorageKey> for String {
    fn from(key: StorageKey) -> Self {
        key.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interface to store and serve images.
#[async_trait]
pub trait ObjectStore {
    /// Stores `upload` under a newly-generated key and returns the key.
    async fn put(&self, upload: Upload) -> StorageResult<StorageKey>;

    /// Returns a URL that grants read access to `key` for at least `ttl`.
    async fn access_url(&self, key: &StorageKey, ttl: Duration) -> StorageResult<String>;

    /// Deletes the object named `key`.
    async fn delete(&self, key: &StorageKey) -> StorageResult<()>;
}

/// Deletes the object named `key` from `store`, logging and swallowing any failure.
pub async fn delete_quietly(store: &(dyn ObjectStore + Send + Sync), key: &StorageKey) {
    if let Err(e) = store.delete(key).await {
        warn!("Failed to delete stored object {}: {}", key, e);
    }
}
