//! ForgeClient — shared HTTP plumbing for every API call: endpoint URLs built
//! from path segments, bearer authentication from the session, and mapping of
//! non-2xx answers into [`ApiError`].

use crate::{
    errors::{ApiError, ForgeError, ForgeResult},
    services::auth_service::AuthClient,
};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use tracing::debug;

#[derive(Clone)]
pub struct ForgeClient {
    http: Client,
    base_url: Url,
    auth: AuthClient,
}

impl ForgeClient {
    pub fn new(http: Client, base_url: &str, auth: AuthClient) -> ForgeResult<Self> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
            auth,
        })
    }

    /// Build `base_url/seg1/seg2/...`, percent-encoding each segment.
    pub fn endpoint(&self, segments: &[&str]) -> ForgeResult<Url> {
        endpoint(&self.base_url, segments)
    }

    /// Start an authorized request against an API path.
    pub async fn request(&self, method: Method, segments: &[&str]) -> ForgeResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        self.request_url(method, url).await
    }

    /// Start an authorized request against an absolute URL, e.g. a pagination link.
    pub async fn request_url(&self, method: Method, url: Url) -> ForgeResult<RequestBuilder> {
        let token = self.auth.access_token().await?;
        debug!(%method, %url, "sending request");
        Ok(self.http.request(method, url).bearer_auth(token))
    }
}

pub(crate) fn parse_base_url(base_url: &str) -> ForgeResult<Url> {
    Url::parse(base_url).map_err(|err| ForgeError::BaseUrl(format!("`{base_url}`: {err}")))
}

pub(crate) fn endpoint(base_url: &Url, segments: &[&str]) -> ForgeResult<Url> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| ForgeError::BaseUrl(format!("`{base_url}` cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Pass 2xx responses through; turn anything else into an [`ApiError`]
/// carrying the status and the body text.
pub async fn ensure_success(response: Response) -> ForgeResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unreadable error body".to_string());
    debug!(status = status.as_u16(), %message, "request rejected");
    Err(ApiError::new(status, message).into())
}
