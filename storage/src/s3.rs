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

//! Object store implementation backed by an Amazon S3 compatible bucket.

use crate::{ObjectStore, StorageError, StorageKey, StorageResult, Upload};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use derivative::Derivative;
use std::error::Error;
use std::time::Duration;
use tripshare_core::env::{get_optional_var, get_required_var};

/// Converts an error from the S3 client into a `StorageError`.
fn sdk_error_to_storage_error<E: Error>(e: E) -> StorageError {
    StorageError::Backend(DisplayErrorContext(e).to_string())
}

/// Options to configure an `S3Store`.
#[derive(Derivative)]
#[derivative(Debug)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct S3Options {
    /// Access key identifier for the bucket.
    #[derivative(Debug = "ignore")]
    pub access_key_id: String,

    /// Secret access key for the bucket.
    #[derivative(Debug = "ignore")]
    pub secret_key: String,

    /// Region where the bucket lives.
    pub region: String,

    /// Name of the bucket where objects are stored.
    pub bucket: String,

    /// Custom endpoint for S3 compatible services other than AWS.
    pub endpoint: Option<String>,
}

impl S3Options {
    /// Creates a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_ACCESS_KEY_ID`, `<prefix>_SECRET_KEY`,
    /// `<prefix>_BUCKET_REGION`, `<prefix>_BUCKET_NAME` and `<prefix>_ENDPOINT`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            access_key_id: get_required_var::<String>(prefix, "ACCESS_KEY_ID")?,
            secret_key: get_required_var::<String>(prefix, "SECRET_KEY")?,
            region: get_required_var::<String>(prefix, "BUCKET_REGION")?,
            bucket: get_required_var::<String>(prefix, "BUCKET_NAME")?,
            endpoint: get_optional_var::<String>(prefix, "ENDPOINT")?,
        })
    }
}

/// Object store that keeps images in an S3 bucket and hands out presigned URLs.
#[derive(Clone)]
pub struct S3Store {
    /// Client for the S3 API.
    client: Client,

    /// Name of the bucket where objects are stored.
    bucket: String,
}

impl S3Store {
    /// Creates a new S3-backed object store using `opts` for configuration.
    pub fn new(opts: S3Options) -> Self {
        let credentials =
            Credentials::new(opts.access_key_id, opts.secret_key, None, None, "tripshare");
        let mut config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(opts.region))
            .credentials_provider(credentials);
        if let Some(endpoint) = opts.endpoint {
            config = config.endpoint_url(endpoint).force_path_style(true);
        }
        Self { client: Client::from_conf(config.build()), bucket: opts.bucket }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, upload: Upload) -> StorageResult<StorageKey> {
        let key = StorageKey::generate(upload.image_type());
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .content_type(upload.image_type().mime())
            .body(ByteStream::from(upload.into_bytes()))
            .send()
            .await
            .map_err(sdk_error_to_storage_error)?;
        Ok(key)
    }

    async fn access_url(&self, key: &StorageKey, ttl: Duration) -> StorageResult<String> {
        let config = PresigningConfig::expires_in(ttl).map_err(sdk_error_to_storage_error)?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .presigned(config)
            .await
            .map_err(sdk_error_to_storage_error)?;
        Ok(request.uri().to_owned())
    }

    async fn delete(&self, key: &StorageKey) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(sdk_error_to_storage_error)?;
        Ok(())
    }
}
