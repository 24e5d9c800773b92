//! Resumable upload sessions and the byte ranges they are split into.

use uuid::Uuid;

/// Fixed size of every chunk but the last: 5 MiB.
pub const CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Files at least this long go through the resumable endpoint.
pub const CHUNKED_UPLOAD_THRESHOLD: u64 = 5_242_879;

/// How a file of a given length is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadStrategy {
    /// One request carrying the whole file.
    Whole,
    /// A resumable session of sequential byte-range requests.
    Chunked,
}

impl UploadStrategy {
    pub fn for_len(len: u64) -> Self {
        if len < CHUNKED_UPLOAD_THRESHOLD {
            UploadStrategy::Whole
        } else {
            UploadStrategy::Chunked
        }
    }
}

/// One inclusive byte range `[start, end]` of a resumable upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkRange {
    /// Zero-based position of this chunk within the session.
    pub index: u64,
    pub start: u64,
    pub end: u64,
    /// Length of the whole file.
    pub total: u64,
}

impl ChunkRange {
    /// Number of bytes carried by this chunk.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_last(&self) -> bool {
        self.end + 1 == self.total
    }

    /// Value of the `Content-Range` header for this chunk.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// A resumable upload: one session id shared by an ordered list of chunks.
#[derive(Clone, Debug)]
pub struct UploadSession {
    pub session_id: String,
    pub chunks: Vec<ChunkRange>,
}

impl UploadSession {
    /// Plan a session for a file of `len` bytes using [`CHUNK_SIZE`] chunks.
    pub fn plan(len: u64) -> Self {
        Self::plan_with_chunk_size(len, CHUNK_SIZE)
    }

    pub fn plan_with_chunk_size(len: u64, chunk_size: u64) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        let count = len.div_ceil(chunk_size);
        let chunks = (0..count)
            .map(|index| {
                let start = index * chunk_size;
                let end = len.min((index + 1) * chunk_size) - 1;
                ChunkRange {
                    index,
                    start,
                    end,
                    total: len,
                }
            })
            .collect();

        Self {
            session_id: Uuid::new_v4().to_string(),
            chunks,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}
