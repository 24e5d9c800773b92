//! ObjectService — uploads a local file into a bucket.
//!
//! Small files go up in one request. Anything at or above
//! [`CHUNKED_UPLOAD_THRESHOLD`] goes through the resumable endpoint as a
//! sequence of byte ranges sharing one session id, each streamed from its own
//! file handle. Chunks are sent strictly one after another; the first failing
//! chunk aborts the upload unless a retry policy allows sending it again.

use crate::{
    errors::{ForgeError, ForgeResult},
    models::{
        bucket::BucketKey,
        multipart::{CHUNKED_UPLOAD_THRESHOLD, ChunkRange, UploadSession, UploadStrategy},
        object::ObjectDetails,
    },
    services::client::{ForgeClient, ensure_success},
};
use bytes::Bytes;
use reqwest::{
    Body, Method, Response, StatusCode,
    header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE},
};
use std::{
    io::{self, SeekFrom},
    path::Path,
    time::Duration,
};
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncSeekExt},
};
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

const SESSION_ID: &str = "Session-Id";
const OCTET_STREAM: &str = "application/octet-stream";

/// How often a failing chunk is sent again, and how long to wait in between.
///
/// The delay doubles after every attempt. The default never retries.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

#[derive(Clone)]
pub struct ObjectService {
    client: ForgeClient,
    retry: RetryPolicy,
}

impl ObjectService {
    pub fn new(client: ForgeClient, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Upload `path` as `object_name`, picking whole or chunked upload by size.
    pub async fn upload_file(
        &self,
        bucket: &BucketKey,
        object_name: &str,
        path: &Path,
    ) -> ForgeResult<ObjectDetails> {
        info!(bucket = %bucket, file = %path.display(), "uploading file");
        let len = fs::metadata(path)
            .await
            .map_err(|err| file_error(path, err))?
            .len();

        match UploadStrategy::for_len(len) {
            UploadStrategy::Whole => self.upload_whole(bucket, object_name, path).await,
            UploadStrategy::Chunked => {
                debug!(len, threshold = CHUNKED_UPLOAD_THRESHOLD, "using resumable upload");
                self.upload_chunked(bucket, object_name, path, len).await
            }
        }
    }

    /// Read the whole file into memory and send it in a single request.
    pub async fn upload_whole(
        &self,
        bucket: &BucketKey,
        object_name: &str,
        path: &Path,
    ) -> ForgeResult<ObjectDetails> {
        let data = Bytes::from(fs::read(path).await.map_err(|err| file_error(path, err))?);
        debug!(len = data.len(), "uploading whole file");

        let response = self
            .client
            .request(Method::PUT, &object_segments(bucket, object_name))
            .await?
            .header(CONTENT_LENGTH, data.len())
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(data)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    /// Send `len` bytes of `path` as a resumable session of sequential chunks.
    pub async fn upload_chunked(
        &self,
        bucket: &BucketKey,
        object_name: &str,
        path: &Path,
        len: u64,
    ) -> ForgeResult<ObjectDetails> {
        let session = UploadSession::plan(len);
        info!(
            session_id = %session.session_id,
            chunks = session.chunk_count(),
            len,
            "starting resumable upload"
        );

        for chunk in &session.chunks {
            let response = self
                .upload_chunk(bucket, object_name, path, &session.session_id, *chunk)
                .await?;
            if !chunk.is_last() {
                continue;
            }
            if response.status() != StatusCode::OK {
                return Err(ForgeError::UploadNotAcknowledged {
                    session_id: session.session_id,
                    status: response.status(),
                });
            }
            return Ok(response.json().await?);
        }

        Err(ForgeError::EmptyUpload(path.display().to_string()))
    }

    /// One chunk, sent again under the retry policy while the failure is transient.
    async fn upload_chunk(
        &self,
        bucket: &BucketKey,
        object_name: &str,
        path: &Path,
        session_id: &str,
        chunk: ChunkRange,
    ) -> ForgeResult<Response> {
        let mut attempt = 0;
        loop {
            match self
                .send_chunk(bucket, object_name, path, session_id, chunk)
                .await
            {
                Ok(response) => {
                    debug!(
                        chunk = chunk.index,
                        range = %chunk.content_range(),
                        status = response.status().as_u16(),
                        "chunk accepted"
                    );
                    return Ok(response);
                }
                Err(err) if attempt < self.retry.max_retries && err.is_retryable() => {
                    let delay = self.retry.delay_for(attempt);
                    attempt += 1;
                    warn!(
                        chunk = chunk.index,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        status = ?err.status(),
                        error = %err,
                        "chunk upload failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_chunk(
        &self,
        bucket: &BucketKey,
        object_name: &str,
        path: &Path,
        session_id: &str,
        chunk: ChunkRange,
    ) -> ForgeResult<Response> {
        let mut file = File::open(path)
            .await
            .map_err(|err| file_error(path, err))?;
        file.seek(SeekFrom::Start(chunk.start))
            .await
            .map_err(|err| file_error(path, err))?;
        let body = Body::wrap_stream(ReaderStream::new(file.take(chunk.len())));

        let mut segments = object_segments(bucket, object_name);
        segments.push("resumable");
        let response = self
            .client
            .request(Method::PUT, &segments)
            .await?
            .header(CONTENT_LENGTH, chunk.len())
            .header(CONTENT_RANGE, chunk.content_range())
            .header(SESSION_ID, session_id)
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(body)
            .send()
            .await?;
        ensure_success(response).await
    }
}

fn object_segments<'a>(bucket: &'a BucketKey, object_name: &'a str) -> Vec<&'a str> {
    vec!["oss", "v2", "buckets", bucket.as_str(), "objects", object_name]
}

fn file_error(path: &Path, source: io::Error) -> ForgeError {
    ForgeError::File {
        path: path.display().to_string(),
        source,
    }
}
