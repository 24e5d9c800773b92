//! BucketService — bucket lookup, creation and listing.

use crate::{
    errors::{ForgeError, ForgeResult},
    models::bucket::{Bucket, BucketKey, BucketPage, BucketSummary, CreateBucketRequest, PolicyKey},
    services::client::{ForgeClient, ensure_success},
};
use reqwest::{Method, Url};
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct BucketService {
    client: ForgeClient,
}

impl BucketService {
    pub fn new(client: ForgeClient) -> Self {
        Self { client }
    }

    /// Details of a bucket. Fails with a 404 [`crate::errors::ApiError`] when
    /// the bucket does not exist.
    pub async fn get_bucket_details(&self, key: &BucketKey) -> ForgeResult<Bucket> {
        info!(bucket = %key, "getting bucket details");
        let response = self
            .client
            .request(Method::GET, &["oss", "v2", "buckets", key.as_str(), "details"])
            .await?
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    pub async fn create_bucket(&self, key: &BucketKey, policy: PolicyKey) -> ForgeResult<Bucket> {
        info!(bucket = %key, policy = policy.as_str(), "creating bucket");
        let response = self
            .client
            .request(Method::POST, &["oss", "v2", "buckets"])
            .await?
            .json(&CreateBucketRequest {
                bucket_key: key.as_str(),
                policy_key: policy,
            })
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    /// Look the bucket up and create it only when the lookup answers 404.
    /// Any other failure is returned unchanged.
    pub async fn ensure_bucket(&self, key: &BucketKey, policy: PolicyKey) -> ForgeResult<Bucket> {
        match self.get_bucket_details(key).await {
            Ok(bucket) => Ok(bucket),
            Err(err) if err.is_not_found() => {
                debug!(bucket = %key, "bucket missing");
                self.create_bucket(key, policy).await
            }
            Err(err) => Err(err),
        }
    }

    /// Every bucket owned by the application, following pagination links.
    ///
    /// A `next` link is resolved against the page it came from. Listing stops
    /// once a link points back to a page that was already fetched.
    pub async fn list_buckets(&self) -> ForgeResult<Vec<BucketSummary>> {
        info!("getting all buckets");
        let mut buckets = Vec::new();
        let mut seen = HashSet::new();
        let mut next: Option<Url> = Some(self.client.endpoint(&["oss", "v2", "buckets"])?);

        while let Some(url) = next.take() {
            if !seen.insert(url.clone()) {
                warn!(%url, "bucket listing links back to a fetched page, stopping");
                break;
            }
            let response = self
                .client
                .request_url(Method::GET, url.clone())
                .await?
                .send()
                .await?;
            let page: BucketPage = ensure_success(response).await?.json().await?;
            buckets.extend(page.items);
            next = page
                .next
                .map(|link| next_page(&url, &link))
                .transpose()?;
        }

        Ok(buckets)
    }
}

fn next_page(current: &Url, link: &str) -> ForgeResult<Url> {
    current.join(link).map_err(|e| ForgeError::PaginationLink {
        link: link.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{bucket_json, client_for, mount_token};
    use reqwest::StatusCode;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path, query_param},
    };

    fn key() -> BucketKey {
        BucketKey::parse("models-abc").unwrap()
    }

    #[tokio::test]
    async fn existing_bucket_is_not_created() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/oss/v2/buckets/models-abc/details"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bucket_json("models-abc")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oss/v2/buckets"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let service = BucketService::new(client_for(&server));
        let bucket = service
            .ensure_bucket(&key(), PolicyKey::Temporary)
            .await
            .unwrap();
        assert_eq!(bucket.bucket_key, "models-abc");
    }

    #[tokio::test]
    async fn ensure_bucket_is_idempotent() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/oss/v2/buckets/models-abc/details"))
            .respond_with(ResponseTemplate::new(404).set_body_string("bucket not found"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/oss/v2/buckets/models-abc/details"))
            .respond_with(ResponseTemplate::new(200).set_body_json(bucket_json("models-abc")))
            .with_priority(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oss/v2/buckets"))
            .and(body_json(serde_json::json!({
                "bucketKey": "models-abc",
                "policyKey": "temporary"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(bucket_json("models-abc")))
            .expect(1)
            .mount(&server)
            .await;

        let service = BucketService::new(client_for(&server));
        let first = service
            .ensure_bucket(&key(), PolicyKey::Temporary)
            .await
            .unwrap();
        let second = service
            .ensure_bucket(&key(), PolicyKey::Temporary)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn forbidden_lookup_does_not_create() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/oss/v2/buckets/models-abc/details"))
            .respond_with(ResponseTemplate::new(403).set_body_string("not your bucket"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oss/v2/buckets"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let service = BucketService::new(client_for(&server));
        let err = service
            .ensure_bucket(&key(), PolicyKey::Temporary)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert!(err.to_string().contains("not your bucket"));
    }

    #[tokio::test]
    async fn create_failure_is_propagated() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/oss/v2/buckets/models-abc/details"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oss/v2/buckets"))
            .respond_with(ResponseTemplate::new(409).set_body_string("taken"))
            .mount(&server)
            .await;

        let service = BucketService::new(client_for(&server));
        let err = service
            .ensure_bucket(&key(), PolicyKey::Persistent)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    }

    #[tokio::test]
    async fn list_buckets_follows_next_links() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        let next = format!("{}/oss/v2/buckets/page2", server.uri());
        Mock::given(method("GET"))
            .and(path("/oss/v2/buckets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"bucketKey": "a-bucket", "createdDate": 1, "policyKey": "transient"}],
                "next": next
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/oss/v2/buckets/page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"bucketKey": "b-bucket", "policyKey": "persistent"}]
            })))
            .mount(&server)
            .await;

        let service = BucketService::new(client_for(&server));
        let keys: Vec<String> = service
            .list_buckets()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.bucket_key)
            .collect();
        assert_eq!(keys, vec!["a-bucket", "b-bucket"]);
    }

    #[tokio::test]
    async fn relative_next_link_is_resolved_against_the_page() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/oss/v2/buckets"))
            .and(query_param("startAt", "b-bucket"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"bucketKey": "b-bucket", "policyKey": "persistent"}]
            })))
            .expect(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/oss/v2/buckets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"bucketKey": "a-bucket", "policyKey": "transient"}],
                "next": "buckets?startAt=b-bucket"
            })))
            .expect(1)
            .with_priority(2)
            .mount(&server)
            .await;

        let service = BucketService::new(client_for(&server));
        let keys: Vec<String> = service
            .list_buckets()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.bucket_key)
            .collect();
        assert_eq!(keys, vec!["a-bucket", "b-bucket"]);
    }

    #[tokio::test]
    async fn next_link_back_to_a_fetched_page_ends_the_listing() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/oss/v2/buckets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"bucketKey": "a-bucket", "policyKey": "transient"}],
                "next": "/oss/v2/buckets"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = BucketService::new(client_for(&server));
        let buckets = service.list_buckets().await.unwrap();
        assert_eq!(buckets.len(), 1);
    }

    #[tokio::test]
    async fn unusable_next_link_is_an_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/oss/v2/buckets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"bucketKey": "a-bucket", "policyKey": "transient"}],
                "next": "http://[bad"
            })))
            .mount(&server)
            .await;

        let service = BucketService::new(client_for(&server));
        let err = service.list_buckets().await.unwrap_err();
        assert!(
            matches!(err, ForgeError::PaginationLink { ref link, .. } if link == "http://[bad")
        );
    }
}
