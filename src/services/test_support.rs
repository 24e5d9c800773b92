//! Shared fixtures for tests running against a `wiremock` stand-in of the API.

use crate::services::{
    auth_service::{AuthClient, DEFAULT_SCOPES},
    client::ForgeClient,
};
use reqwest::Client;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/authentication/v1/authenticate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "test-token",
            "token_type": "Bearer",
            "expires_in": 3599
        })))
        .mount(server)
        .await;
}

pub fn client_for(server: &MockServer) -> ForgeClient {
    let http = Client::new();
    let scopes = DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect();
    let auth = AuthClient::new(http.clone(), &server.uri(), "client", "secret", scopes, true)
        .expect("mock server uri parses");
    ForgeClient::new(http, &server.uri(), auth).expect("mock server uri parses")
}

pub fn bucket_json(key: &str) -> serde_json::Value {
    serde_json::json!({
        "bucketKey": key,
        "bucketOwner": "client",
        "createdDate": 1_700_000_000_000i64,
        "permissions": [{"authId": "client", "access": "full"}],
        "policyKey": "temporary"
    })
}

pub fn object_json(bucket: &str, name: &str, size: u64) -> serde_json::Value {
    serde_json::json!({
        "bucketKey": bucket,
        "objectId": format!("urn:adsk.objects:os.object:{bucket}/{name}"),
        "objectKey": name,
        "sha1": "0123456789abcdef",
        "size": size,
        "location": format!("https://example.invalid/oss/v2/buckets/{bucket}/objects/{name}")
    })
}
