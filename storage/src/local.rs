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

//! Object store implementation backed by a local directory.

use crate::{ObjectStore, StorageError, StorageKey, StorageResult, Upload};
use async_trait::async_trait;
use derivative::Derivative;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tripshare_core::env::get_optional_var;
use url::Url;

/// Default directory where objects are stored.
const DEFAULT_DIR: &str = "uploads/images";

/// Default base URL under which the directory is served.
const DEFAULT_BASE_URL: &str = "http://localhost:5000/uploads/images/";

/// Options to configure a `LocalStore`.
#[derive(Derivative)]
#[derivative(Debug)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct LocalStoreOptions {
    /// Directory where objects are stored.
    pub dir: PathBuf,

    /// Public URL under which the contents of `dir` are served.
    pub base_url: Url,
}

impl LocalStoreOptions {
    /// Creates a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_DIR` and `<prefix>_BASE_URL`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let dir =
            get_optional_var::<String>(prefix, "DIR")?.unwrap_or_else(|| DEFAULT_DIR.to_owned());
        let base_url = get_optional_var::<String>(prefix, "BASE_URL")?
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        Ok(Self { dir: PathBuf::from(dir), base_url: parse_base_url(base_url)? })
    }
}

/// Parses a base URL, making sure it ends in a slash so that keys can be joined to it.
fn parse_base_url(mut raw: String) -> Result<Url, String> {
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| format!("Invalid base URL '{}': {}", raw, e))
}

/// Object store that keeps images as files in a directory that is served statically.
///
/// Access URLs are not signed and never expire.
#[derive(Clone)]
pub struct LocalStore {
    /// Directory where objects are stored.
    dir: PathBuf,

    /// Public URL under which the contents of `dir` are served.
    base_url: Url,
}

impl LocalStore {
    /// Creates a new directory-backed object store using `opts` for configuration.
    pub fn new(opts: LocalStoreOptions) -> Self {
        Self { dir: opts.dir, base_url: opts.base_url }
    }

    /// Returns the directory where objects are stored.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, upload: Upload) -> StorageResult<StorageKey> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            StorageError::Backend(format!("Cannot create {}: {}", self.dir.display(), e))
        })?;

        let key = StorageKey::generate(upload.image_type());
        let path = self.dir.join(key.as_str());
        fs::write(&path, upload.into_bytes())
            .await
            .map_err(|e| StorageError::Backend(format!("Cannot write {}: {}", path.display(), e)))?;
        Ok(key)
    }

    async fn access_url(&self, key: &StorageKey, _ttl: Duration) -> StorageResult<String> {
        self.base_url
            .join(key.as_str())
            .map(String::from)
            .map_err(|e| StorageError::Backend(format!("Cannot build URL for {}: {}", key, e)))
    }

    async fn delete(&self, key: &StorageKey) -> StorageResult<()> {
        let path = self.dir.join(key.as_str());
        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::Backend(format!("Cannot delete {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    pub fn test_localstoreoptions_from_env_all_present() {
        let overrides = [
            ("LOCAL_STORAGE_DIR", Some("/srv/images")),
            ("LOCAL_STORAGE_BASE_URL", Some("https://trips.example.com/uploads/images")),
        ];
        temp_env::with_vars(overrides, || {
            let opts = LocalStoreOptions::from_env("LOCAL_STORAGE").unwrap();
            assert_eq!(
                LocalStoreOptions {
                    dir: PathBuf::from("/srv/images"),
                    base_url: Url::parse("https://trips.example.com/uploads/images/").unwrap(),
                },
                opts
            );
        });
    }

    #[test]
    pub fn test_localstoreoptions_from_env_use_defaults() {
        temp_env::with_vars_unset(["LOCAL_STORAGE_DIR", "LOCAL_STORAGE_BASE_URL"], || {
            let opts = LocalStoreOptions::from_env("LOCAL_STORAGE").unwrap();
            assert_eq!(PathBuf::from(DEFAULT_DIR), opts.dir);
            assert_eq!(DEFAULT_BASE_URL, opts.base_url.as_str());
        });
    }

    #[test]
    pub fn test_localstoreoptions_from_env_bad_url() {
        temp_env::with_var("LOCAL_STORAGE_BASE_URL", Some("not a url"), || {
            let err = LocalStoreOptions::from_env("LOCAL_STORAGE").unwrap_err();
            assert!(err.contains("Invalid base URL"));
        });
    }

    fn setup(dir: &tempfile::TempDir) -> LocalStore {
        LocalStore::new(LocalStoreOptions {
            dir: dir.path().join("images"),
            base_url: Url::parse("http://localhost:1234/uploads/images/").unwrap(),
        })
    }

    #[tokio::test]
    async fn test_put_access_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = setup(&dir);

        let upload = Upload::new(Bytes::from_static(b"png bytes"), "image/png").unwrap();
        let key = store.put(upload).await.unwrap();
        let path = store.dir().join(key.as_str());
        assert_eq!(b"png bytes".to_vec(), fs::read(&path).await.unwrap());

        let url = store.access_url(&key, Duration::from_secs(10)).await.unwrap();
        assert_eq!(format!("http://localhost:1234/uploads/images/{}", key), url);

        store.delete(&key).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = setup(&dir);

        match store.delete(&StorageKey::new("missing.png").unwrap()).await {
            Err(StorageError::Backend(msg)) => assert!(msg.contains("missing.png")),
            e => panic!("{:?}", e),
        }
    }
}
