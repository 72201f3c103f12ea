//! S3-compatible object store client

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client as S3Client;
use bridge_traits::{
    error::Result as BridgeResult,
    media::DynAsyncRead,
    object_store::{RemoteObject, RemoteObjectStore},
    storage::RemoteConfig,
};
use core_async::io::AsyncReadExt;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, S3Error};
use crate::key::KeyPrefix;

/// Region used for signing when the remote does not name one. MinIO and most
/// self-hosted gateways accept it.
pub const DEFAULT_REGION: &str = "us-east-1";

const CREDENTIALS_PROVIDER_NAME: &str = "zimsync-remote-config";

/// Objects up to this size go out in one PutObject; larger ones as a
/// multipart upload with parts of at least this size. S3 requires 5 MiB for
/// every part but the last.
const PART_SIZE: u64 = 8 * 1024 * 1024;

/// Part count limit of a multipart upload.
const MAX_PARTS: u64 = 10_000;

/// Object store client bound to one bucket and key prefix.
///
/// Uses path-style addressing so that custom endpoints without wildcard DNS
/// (MinIO, Garage, a NAS) work the same as AWS.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    prefix: KeyPrefix,
}

impl S3ObjectStore {
    /// Build a client from a remote configuration.
    ///
    /// No request is sent; bad credentials or an unknown bucket surface on the
    /// first listing or upload.
    pub async fn connect(config: &RemoteConfig) -> Result<Self> {
        let region = config
            .region
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER_NAME,
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region))
            .endpoint_url(config.url.trim_end_matches('/'))
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Ok(Self::from_client(
            S3Client::from_conf(s3_config),
            config.bucket.clone(),
            KeyPrefix::new(config.prefix.as_deref()),
        ))
    }

    pub fn from_client(client: S3Client, bucket: impl Into<String>, prefix: KeyPrefix) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &KeyPrefix {
        &self.prefix
    }

    async fn list_all(&self) -> Result<Vec<RemoteObject>> {
        let mut objects = Vec::new();
        let mut continuation: Option<String> = None;
        let list_prefix = (!self.prefix.is_root()).then(|| self.prefix.as_str().to_string());

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_prefix(list_prefix.clone())
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| S3Error::ListFailed {
                    bucket: self.bucket.clone(),
                    message: DisplayErrorContext(&e).to_string(),
                })?;

            for object in page.contents() {
                let Some(name) = object.key().and_then(|key| self.prefix.name_for(key)) else {
                    continue;
                };
                let size = object.size().and_then(|s| u64::try_from(s).ok());
                objects.push(RemoteObject::new(name, size));
            }

            debug!(bucket = %self.bucket, listed = objects.len(), "Fetched listing page");

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(objects)
    }

    /// Uploads `size` bytes from `stream`, holding at most one part in memory.
    async fn put(
        &self,
        mut stream: Box<DynAsyncRead>,
        key: String,
        content_type: &str,
        size: u64,
    ) -> Result<()> {
        let part_size = part_size_for(size);
        let wanted = size.min(part_size);
        let first = read_part(&mut *stream, &key, wanted).await?;
        ensure_full(&key, size, 0, &first, wanted)?;

        if size <= part_size {
            ensure_exhausted(&mut *stream, &key, size).await?;
            drop(stream);
            self.put_single(&key, content_type, first).await?;
        } else {
            self.put_multipart(&mut *stream, &key, content_type, size, part_size, first)
                .await?;
        }

        info!(bucket = %self.bucket, key = %key, bytes = size, "Uploaded object");
        Ok(())
    }

    async fn put_single(&self, key: &str, content_type: &str, body: Vec<u8>) -> Result<()> {
        let content_length = body.len() as i64;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(content_length)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| put_failed(key, &e))?;
        Ok(())
    }

    async fn put_multipart(
        &self,
        stream: &mut DynAsyncRead,
        key: &str,
        content_type: &str,
        size: u64,
        part_size: u64,
        first: Vec<u8>,
    ) -> Result<()> {
        let upload = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| put_failed(key, &e))?;
        let upload_id = upload
            .upload_id()
            .ok_or_else(|| S3Error::PutFailed {
                key: key.to_string(),
                message: "server returned no upload id".to_string(),
            })?
            .to_string();

        let parts = match self
            .upload_parts(stream, key, &upload_id, size, part_size, first)
            .await
        {
            Ok(parts) => parts,
            Err(e) => {
                if let Err(abort) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(key = %key, error = %DisplayErrorContext(&abort), "Failed to abort multipart upload");
                }
                return Err(e);
            }
        };

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| put_failed(key, &e))?;
        Ok(())
    }

    async fn upload_parts(
        &self,
        stream: &mut DynAsyncRead,
        key: &str,
        upload_id: &str,
        size: u64,
        part_size: u64,
        first: Vec<u8>,
    ) -> Result<Vec<CompletedPart>> {
        let mut parts = Vec::new();
        let mut sent = 0u64;
        let mut part = first;

        loop {
            let len = part.len() as u64;
            let part_number = parts.len() as i32 + 1;
            let output = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .content_length(len as i64)
                .body(ByteStream::from(part))
                .send()
                .await
                .map_err(|e| put_failed(key, &e))?;

            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .set_e_tag(output.e_tag().map(str::to_string))
                    .build(),
            );
            sent += len;
            debug!(key = %key, part = part_number, sent, "Uploaded part");

            if sent == size {
                break;
            }
            let wanted = (size - sent).min(part_size);
            part = read_part(stream, key, wanted).await?;
            ensure_full(key, size, sent, &part, wanted)?;
        }

        ensure_exhausted(stream, key, size).await?;
        Ok(parts)
    }
}

fn put_failed<E: std::error::Error>(key: &str, error: &E) -> S3Error {
    S3Error::PutFailed {
        key: key.to_string(),
        message: DisplayErrorContext(error).to_string(),
    }
}

/// Part size for an object of `size` bytes, grown past [`PART_SIZE`] when
/// the object would need more than [`MAX_PARTS`] parts.
fn part_size_for(size: u64) -> u64 {
    PART_SIZE.max(size.div_ceil(MAX_PARTS))
}

/// Reads up to `len` bytes; fewer only when the stream ends first.
async fn read_part(stream: &mut DynAsyncRead, key: &str, len: u64) -> Result<Vec<u8>> {
    let mut part = Vec::with_capacity(len as usize);
    (&mut *stream)
        .take(len)
        .read_to_end(&mut part)
        .await
        .map_err(|source| S3Error::StreamRead {
            key: key.to_string(),
            source,
        })?;
    Ok(part)
}

fn ensure_full(key: &str, size: u64, offset: u64, part: &[u8], wanted: u64) -> Result<()> {
    let len = part.len() as u64;
    if len < wanted {
        return Err(S3Error::SizeMismatch {
            key: key.to_string(),
            expected: size,
            actual: offset + len,
        });
    }
    Ok(())
}

/// Fails when the stream has data left after `expected` bytes.
async fn ensure_exhausted(stream: &mut DynAsyncRead, key: &str, expected: u64) -> Result<()> {
    let mut extra = [0u8; 1];
    let n = stream
        .read(&mut extra)
        .await
        .map_err(|source| S3Error::StreamRead {
            key: key.to_string(),
            source,
        })?;
    if n > 0 {
        return Err(S3Error::StreamOverrun {
            key: key.to_string(),
            expected,
        });
    }
    Ok(())
}

#[async_trait]
impl RemoteObjectStore for S3ObjectStore {
    #[instrument(skip(self), fields(bucket = %self.bucket, prefix = %self.prefix.as_str()))]
    async fn list_objects(&self) -> BridgeResult<Vec<RemoteObject>> {
        let objects = self.list_all().await?;
        info!(count = objects.len(), "Listed remote objects");
        Ok(objects)
    }

    #[instrument(skip(self, stream), fields(bucket = %self.bucket))]
    async fn put_object(
        &self,
        stream: Box<DynAsyncRead>,
        name: &str,
        content_type: &str,
        size: u64,
    ) -> BridgeResult<()> {
        let key = self.prefix.key_for(name);
        Ok(self.put(stream, key, content_type, size).await?)
    }
}
