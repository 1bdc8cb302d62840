// crates/substrate-adapters/src/s3.rs
// ============================================================================
// Module: S3 Object Store Adapter
// Description: Durable object-store adapter backed by an S3-compatible bucket.
// Purpose: Reference durable implementation of the `ObjectStore` contract.
// Dependencies: aws-sdk-s3, aws-config, substrate-core, tokio
// ============================================================================

//! ## Overview
//! The `ObjectStore` trait is synchronous so services can call it without
//! depending on an async runtime; this adapter bridges that synchronous
//! contract onto the async `aws-sdk-s3` client the same way the teacher's
//! runpack object-store adapter does: by running each call to completion on
//! a dedicated multi-thread runtime.

use std::sync::Arc;

use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use substrate_core::AdapterError;
use substrate_core::ObjectListPage;
use substrate_core::ObjectStore;
use tokio::runtime::Builder;
use tokio::runtime::Runtime;

/// Durable `ObjectStore` adapter over an S3-compatible bucket.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    root_prefix: String,
    runtime: Arc<Runtime>,
}

impl S3ObjectStore {
    /// Builds an adapter for `bucket`, prefixing every key with `root_prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Unavailable`] when a dedicated tokio runtime
    /// cannot be constructed.
    pub fn new(client: Client, bucket: impl Into<String>, root_prefix: impl Into<String>) -> Result<Self, AdapterError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|err| AdapterError::Unavailable(format!("failed to start s3 runtime: {err}")))?;
        Ok(Self {
            client,
            bucket: bucket.into(),
            root_prefix: root_prefix.into(),
            runtime: Arc::new(runtime),
        })
    }

    fn full_key(&self, key: &str) -> String {
        if self.root_prefix.is_empty() {
            key.to_owned()
        } else {
            format!("{}/{}", self.root_prefix.trim_end_matches('/'), key)
        }
    }

    /// Runs `fut` to completion, using the in-flight Tokio handle when one is
    /// already present (this method was called from within async code) and
    /// falling back to the dedicated runtime otherwise.
    fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => tokio::task::block_in_place(|| handle.block_on(fut)),
            Err(_) => self.runtime.block_on(fut),
        }
    }
}

impl ObjectStore for S3ObjectStore {
    fn put(&self, key: &str, bytes: &[u8], content_type: Option<&str>) -> Result<(), AdapterError> {
        let full_key = self.full_key(key);
        let body = ByteStream::from(bytes.to_vec());
        let mut request = self.client.put_object().bucket(&self.bucket).key(&full_key).body(body);
        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }
        self.block_on(request.send())
            .map(|_| ())
            .map_err(|err| AdapterError::Unavailable(format!("s3 put failed: {err}")))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AdapterError> {
        let full_key = self.full_key(key);
        let result = self.block_on(self.client.get_object().bucket(&self.bucket).key(&full_key).send());
        match result {
            Ok(output) => {
                let bytes = self
                    .block_on(output.body.collect())
                    .map_err(|err| AdapterError::Unavailable(format!("s3 get body read failed: {err}")))?;
                Ok(Some(bytes.to_vec()))
            }
            Err(err) if is_not_found(&err) => Ok(None),
            Err(err) => Err(AdapterError::Unavailable(format!("s3 get failed: {err}"))),
        }
    }

    fn exists(&self, key: &str) -> Result<bool, AdapterError> {
        let full_key = self.full_key(key);
        let result = self.block_on(self.client.head_object().bucket(&self.bucket).key(&full_key).send());
        match result {
            Ok(_) => Ok(true),
            Err(err) if is_not_found(&err) => Ok(false),
            Err(err) => Err(AdapterError::Unavailable(format!("s3 head failed: {err}"))),
        }
    }

    fn list(&self, prefix: &str, cursor: Option<&str>) -> Result<ObjectListPage, AdapterError> {
        let full_prefix = self.full_key(prefix);
        let mut request = self.client.list_objects_v2().bucket(&self.bucket).prefix(&full_prefix);
        if let Some(token) = cursor {
            request = request.continuation_token(token);
        }
        let output = self
            .block_on(request.send())
            .map_err(|err| AdapterError::Unavailable(format!("s3 list failed: {err}")))?;
        let strip_len = self.root_prefix.trim_end_matches('/').len() + usize::from(!self.root_prefix.is_empty());
        let keys = output
            .contents()
            .iter()
            .filter_map(|obj| obj.key())
            .map(|k| k.get(strip_len..).unwrap_or(k).to_owned())
            .collect();
        Ok(ObjectListPage {
            keys,
            next_cursor: output.next_continuation_token().map(str::to_owned),
        })
    }

    fn delete(&self, key: &str) -> Result<(), AdapterError> {
        let full_key = self.full_key(key);
        self.block_on(self.client.delete_object().bucket(&self.bucket).key(&full_key).send())
            .map(|_| ())
            .map_err(|err| AdapterError::Unavailable(format!("s3 delete failed: {err}")))
    }
}

fn is_not_found<E>(err: &aws_sdk_s3::error::SdkError<E>) -> bool
where
    E: std::error::Error + Send + Sync + 'static,
{
    matches!(
        err,
        aws_sdk_s3::error::SdkError::ServiceError(service_err)
            if service_err.raw().status().as_u16() == 404
    )
}
