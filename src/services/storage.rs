use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use std::pin::Pin;
use tokio::io::AsyncRead;

use crate::error::{TransferError, TransferResult};
use crate::models::{ObjectKey, RemoteLocation};

/// Body of a fetched object, consumed once by the staging store.
pub type ObjectStream = Pin<Box<dyn AsyncRead + Send>>;

/// Single-object put/get against a remote bucket.
///
/// Implementations never retry; every call is independent of the previous one.
#[async_trait]
pub trait TransferClient: Send + Sync {
    /// Creates or overwrites `key` with `body`.
    async fn put(
        &self,
        key: &ObjectKey,
        body: Bytes,
        content_type: &str,
    ) -> TransferResult<RemoteLocation>;

    /// Opens the object's content as a stream. `NotFound` if the key is absent.
    async fn get(&self, key: &ObjectKey) -> TransferResult<ObjectStream>;

    /// Checks that the bucket is reachable. Diagnostics only.
    async fn probe(&self) -> TransferResult<()>;
}

pub struct S3TransferClient {
    client: Client,
    bucket: String,
}

impl S3TransferClient {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl TransferClient for S3TransferClient {
    async fn put(
        &self,
        key: &ObjectKey,
        body: Bytes,
        content_type: &str,
    ) -> TransferResult<RemoteLocation> {
        let size = body.len() as u64;
        let res = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await;

        match res {
            Ok(output) => Ok(RemoteLocation {
                bucket: self.bucket.clone(),
                key: key.clone(),
                size,
                etag: output.e_tag().map(str::to_string),
            }),
            Err(e) => {
                tracing::error!(
                    "S3 put_object failed: bucket={}, key={}, error={}",
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                );
                Err(classify_sdk_error(e))
            }
        }
    }

    async fn get(&self, key: &ObjectKey) -> TransferResult<ObjectStream> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await;

        match res {
            Ok(output) => Ok(Box::pin(output.body.into_async_read())),
            Err(SdkError::ServiceError(ctx))
                if ctx.err().is_no_such_key()
                    || is_missing_object(ctx.err().code(), ctx.raw().status().as_u16()) =>
            {
                Err(TransferError::NotFound {
                    key: key.to_string(),
                })
            }
            Err(e) => {
                tracing::error!(
                    "S3 get_object failed: bucket={}, key={}, error={}",
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                );
                Err(classify_sdk_error(e))
            }
        }
    }

    async fn probe(&self) -> TransferResult<()> {
        let res = self
            .client
            .get_bucket_location()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        // An empty constraint is how S3 reports us-east-1.
        let location = res
            .location_constraint()
            .map(|c| c.as_str())
            .filter(|c| !c.is_empty())
            .unwrap_or("us-east-1");
        tracing::info!("Bucket '{}' location: {}", self.bucket, location);
        Ok(())
    }
}

/// Service responses become `Backend`; everything that never produced one
/// (credentials, DNS, TLS, timeouts) becomes `Transport`.
fn classify_sdk_error<E>(err: SdkError<E, HttpResponse>) -> TransferError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match err {
        SdkError::ServiceError(ctx) => {
            let status = ctx.raw().status().as_u16();
            let service_err = ctx.err();
            backend_error(service_err.code(), service_err.message(), status)
        }
        other => TransferError::Transport(DisplayErrorContext(&other).to_string()),
    }
}

fn backend_error(code: Option<&str>, message: Option<&str>, status: u16) -> TransferError {
    TransferError::Backend {
        code: code.unwrap_or("Unknown").to_string(),
        status,
        message: message
            .map(str::to_string)
            .unwrap_or_else(|| format!("request failed with HTTP {}", status)),
    }
}

/// A bare 404 (no error body, as for HEAD-style responses) or an explicit
/// missing-key code. `NoSuchBucket` is a backend error, not a missing object.
fn is_missing_object(code: Option<&str>, status: u16) -> bool {
    match code {
        Some("NoSuchKey") | Some("NotFound") => true,
        Some(_) => false,
        None => status == 404,
    }
}
