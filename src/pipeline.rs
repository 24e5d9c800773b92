//! The fixed call chain: authenticate, ensure the bucket, list buckets,
//! upload, translate, check the manifest.
//!
//! Each step awaits the previous one. Listing buckets is informational only,
//! so its failure is logged and the chain carries on.

use crate::{
    config::AppConfig,
    errors::{ForgeError, ForgeResult},
    models::{
        manifest::{Manifest, ManifestCheck},
        object::{ObjectDetails, Urn},
    },
    services::{
        auth_service::AuthClient,
        bucket_service::BucketService,
        client::ForgeClient,
        derivative_service::DerivativeService,
        object_service::{ObjectService, RetryPolicy},
    },
};
use reqwest::Client;
use tracing::{info, warn};

/// What a completed run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub object: ObjectDetails,
    pub urn: Urn,
    /// Present only when the translation finished within the allowed checks.
    pub manifest: Option<Manifest>,
}

pub async fn run(cfg: &AppConfig) -> ForgeResult<RunSummary> {
    let mut builder = Client::builder();
    if let Some(timeout) = cfg.request_timeout {
        builder = builder.timeout(timeout);
    }
    let http = builder.build()?;

    let auth = AuthClient::new(
        http.clone(),
        &cfg.base_url,
        &cfg.client_id,
        &cfg.client_secret,
        cfg.scopes.clone(),
        cfg.auto_refresh,
    )?;
    auth.authenticate().await?;
    let client = ForgeClient::new(http, &cfg.base_url, auth)?;

    let buckets = BucketService::new(client.clone());
    let bucket = buckets
        .ensure_bucket(&cfg.bucket_key, cfg.bucket_policy)
        .await?;
    info!(
        bucket = %bucket.bucket_key,
        policy = bucket.policy_key.as_str(),
        created = ?bucket.created_at(),
        "bucket ready"
    );

    match buckets.list_buckets().await {
        Ok(all) => {
            info!(count = all.len(), "buckets owned by this application");
            for summary in &all {
                info!(policy = summary.policy_key.as_str(), "  {}", summary.bucket_key);
            }
        }
        Err(err) => warn!(error = %err, "could not list buckets"),
    }

    let retry = RetryPolicy {
        max_retries: cfg.chunk_retries,
        base_delay: cfg.retry_base_delay,
    };
    let objects = ObjectService::new(client.clone(), retry);
    let object = objects
        .upload_file(&cfg.bucket_key, &cfg.file_name, &cfg.file_path)
        .await?;
    info!(object_id = %object.object_id, size = ?object.size, "upload acknowledged");

    let urn = object.urn();
    let derivatives = DerivativeService::new(client);
    derivatives.translate(&urn, cfg.force_translate).await?;
    info!(%urn, "translation job accepted");

    let mut manifest = None;
    for attempt in 1..=cfg.manifest_polls {
        let check = derivatives.check_manifest(&urn).await?;
        if check.has_failed() {
            return Err(ForgeError::TranslationFailed {
                urn: urn.to_string(),
                status: check.status().to_string(),
            });
        }
        match check {
            ManifestCheck::Complete(done) => {
                manifest = Some(done);
                break;
            }
            ManifestCheck::Pending { progress, .. } if attempt < cfg.manifest_polls => {
                info!(attempt, %progress, "checking the manifest again");
                tokio::time::sleep(cfg.poll_interval).await;
            }
            ManifestCheck::Pending { .. } => {}
        }
    }

    Ok(RunSummary {
        object,
        urn,
        manifest,
    })
}
