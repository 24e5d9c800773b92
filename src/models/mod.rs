//! Data models exchanged with the object store and the derivative service.
//!
//! These map onto the JSON bodies of the REST API via `serde`, plus the
//! purely local planning types used by resumable uploads.

pub mod bucket;
pub mod manifest;
pub mod multipart;
pub mod object;
