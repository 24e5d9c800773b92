//! DerivativeService — translation jobs and manifest checks.

use crate::{
    errors::ForgeResult,
    models::{
        manifest::{JobAccepted, JobPayload, Manifest, ManifestCheck},
        object::Urn,
    },
    services::client::{ForgeClient, ensure_success},
};
use reqwest::Method;
use tracing::{info, warn};

const FORCE_HEADER: &str = "x-ads-force";

#[derive(Clone)]
pub struct DerivativeService {
    client: ForgeClient,
}

impl DerivativeService {
    pub fn new(client: ForgeClient) -> Self {
        Self { client }
    }

    /// Submit a job converting the source at `urn` into the viewable format.
    ///
    /// The conversion runs remotely; success only means the job was accepted.
    /// With `force`, derivatives from an earlier translation are replaced.
    pub async fn translate(&self, urn: &Urn, force: bool) -> ForgeResult<JobAccepted> {
        info!(%urn, force, "translating file derivative");
        let mut request = self
            .client
            .request(Method::POST, &["modelderivative", "v2", "designdata", "job"])
            .await?
            .json(&JobPayload::viewable(urn));
        if force {
            request = request.header(FORCE_HEADER, "true");
        }

        let response = request.send().await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    /// Fetch the manifest once. Re-invoke to poll again.
    pub async fn check_manifest(&self, urn: &Urn) -> ForgeResult<ManifestCheck> {
        let response = self
            .client
            .request(
                Method::GET,
                &["modelderivative", "v2", "designdata", urn.as_str(), "manifest"],
            )
            .await?
            .send()
            .await?;
        let manifest: Manifest = ensure_success(response).await?.json().await?;

        if manifest.is_complete() {
            info!(%urn, status = %manifest.status, "translation complete");
            Ok(ManifestCheck::Complete(manifest))
        } else {
            warn!(
                %urn,
                status = %manifest.status,
                progress = %manifest.progress,
                "translation not complete yet"
            );
            Ok(ManifestCheck::Pending {
                status: manifest.status,
                progress: manifest.progress,
            })
        }
    }
}
