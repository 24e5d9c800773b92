//! Represents a bucket — the top-level container objects are uploaded into.

use crate::errors::{ForgeError, ForgeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const BUCKET_KEY_MIN_LEN: usize = 3;
const BUCKET_KEY_MAX_LEN: usize = 128;

/// Retention policy of a bucket. Fixed at creation time.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKey {
    /// Objects are kept for 24 hours.
    Transient,
    /// Objects are kept for 30 days.
    #[default]
    Temporary,
    /// Objects are kept until deleted.
    Persistent,
}

impl PolicyKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKey::Transient => "transient",
            PolicyKey::Temporary => "temporary",
            PolicyKey::Persistent => "persistent",
        }
    }
}

impl std::str::FromStr for PolicyKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "transient" => Ok(PolicyKey::Transient),
            "temporary" => Ok(PolicyKey::Temporary),
            "persistent" => Ok(PolicyKey::Persistent),
            other => Err(format!(
                "unknown bucket policy `{other}` (expected transient, temporary or persistent)"
            )),
        }
    }
}

/// A validated, globally unique bucket key.
///
/// Allowed characters are `-_.a-z0-9`, between 3 and 128 characters long.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketKey(String);

impl BucketKey {
    pub fn parse(key: impl Into<String>) -> ForgeResult<Self> {
        let key = key.into();
        let invalid = |reason: &str| ForgeError::InvalidBucketKey {
            key: key.clone(),
            reason: reason.into(),
        };

        let len = key.len();
        if !(BUCKET_KEY_MIN_LEN..=BUCKET_KEY_MAX_LEN).contains(&len) {
            return Err(invalid("must be between 3 and 128 characters"));
        }

        if !key
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '-' | '_' | '.'))
        {
            return Err(invalid(
                "allowed characters are lowercase letters, digits, `-`, `_` and `.`",
            ));
        }

        Ok(Self(key))
    }

    /// Derive the key the way buckets are named per application: the chosen
    /// bucket name followed by the lowercased client id.
    pub fn for_client(bucket_name: &str, client_id: &str) -> ForgeResult<Self> {
        Self::parse(format!("{}{}", bucket_name, client_id.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bucket details as reported by the object store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub bucket_key: String,

    /// Application (client id) that owns this bucket.
    #[serde(default)]
    pub bucket_owner: Option<String>,

    /// Creation time in milliseconds since the epoch.
    #[serde(default)]
    pub created_date: Option<i64>,

    #[serde(default)]
    pub permissions: Vec<Permission>,

    pub policy_key: PolicyKey,
}

impl Bucket {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_date.and_then(DateTime::from_timestamp_millis)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub auth_id: String,
    pub access: String,
}

/// Body of the create-bucket call.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateBucketRequest<'a> {
    pub bucket_key: &'a str,
    pub policy_key: PolicyKey,
}

/// One page of the bucket listing.
#[derive(Deserialize, Debug)]
pub struct BucketPage {
    pub items: Vec<BucketSummary>,

    /// Link to the next page, absent on the last one. May be relative.
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    pub bucket_key: String,
    #[serde(default)]
    pub created_date: Option<i64>,
    pub policy_key: PolicyKey,
}
