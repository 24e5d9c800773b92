//! Represents an object (file) uploaded into a bucket, and the URN derived from it.

use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Object descriptor returned once an upload is acknowledged.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDetails {
    pub bucket_key: String,

    /// Backend identifier, e.g. `urn:adsk.objects:os.object:bucket/name`.
    pub object_id: String,

    pub object_key: String,

    #[serde(default)]
    pub sha1: Option<String>,

    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub content_type: Option<String>,

    #[serde(default)]
    pub location: Option<String>,
}

impl ObjectDetails {
    pub fn urn(&self) -> Urn {
        Urn::from_object_id(&self.object_id)
    }
}

/// Base64-URL encoded object id, the handle used for every derivative call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Urn(String);

impl Urn {
    /// Encode an object id. Padding is stripped, the derivative service rejects it.
    pub fn from_object_id(object_id: &str) -> Self {
        Self(general_purpose::URL_SAFE_NO_PAD.encode(object_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
