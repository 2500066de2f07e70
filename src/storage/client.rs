//! HTTP client for a Supabase-compatible storage and functions API.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use serde_json::{json, Value};

use super::{ObjectStore, Result, StorageError};

pub struct StorageClient {
    base_url: String,
    api_key: String,
    bucket: String,
    http_client: Client,
}

impl StorageClient {
    pub fn new(base_url: &str, api_key: &str, bucket: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bucket: bucket.to_string(),
            http_client,
        }
    }

    /// Build a client with its own connection pool and request timeout.
    pub fn with_timeout(
        base_url: &str,
        api_key: &str,
        bucket: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(base_url, api_key, bucket, http_client))
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StorageError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ObjectStore for StorageClient {
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<()> {
        let response = self
            .http_client
            .post(self.object_url(path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;

        check(response).await?;
        tracing::debug!(path, "Uploaded object");
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }

        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        let response = self
            .http_client
            .delete(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&json!({ "prefixes": paths }))
            .send()
            .await?;

        check(response).await?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    async fn invoke(&self, function: &str, body: Value) -> Result<Value> {
        let url = format!("{}/functions/v1/{}", self.base_url, function);
        let response = self
            .http_client
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StorageError::Function {
                name: function.to_string(),
                message: format!("{}: {}", status.as_u16(), text),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| StorageError::Function {
            name: function.to_string(),
            message: format!("invalid JSON response: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> StorageClient {
        StorageClient::new(&server.uri(), "service-key", "images", Client::new())
    }

    #[tokio::test]
    async fn test_upload_posts_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/images/recipes/a.jpg"))
            .and(header("apikey", "service-key"))
            .and(header("Authorization", "Bearer service-key"))
            .and(header("Content-Type", "image/jpeg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "images/recipes/a.jpg" })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .upload("recipes/a.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).set_body_string("Duplicate"))
            .mount(&server)
            .await;

        let err = client(&server)
            .upload("recipes/a.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap_err();
        match err {
            StorageError::Api { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "Duplicate");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remove_sends_prefixes() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/object/images"))
            .and(body_json(json!({ "prefixes": ["recipes/a.jpg"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .remove(&["recipes/a.jpg".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invoke_function() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/functions/v1/convert-heic"))
            .and(body_json(json!({ "path": "recipes/a.heic" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "path": "recipes/a.jpg" })))
            .mount(&server)
            .await;

        let value = client(&server)
            .invoke("convert-heic", json!({ "path": "recipes/a.heic" }))
            .await
            .unwrap();
        assert_eq!(value["path"], "recipes/a.jpg");
    }

    #[tokio::test]
    async fn test_invoke_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/functions/v1/convert-heic"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server)
            .invoke("convert-heic", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Function { .. }));
    }

    #[test]
    fn test_public_url_round_trip() {
        let client = StorageClient::new("https://xyz.supabase.co/", "k", "images", Client::new());
        let url = client.public_url("recipes/a.jpg");
        assert_eq!(
            url,
            "https://xyz.supabase.co/storage/v1/object/public/images/recipes/a.jpg"
        );
        assert_eq!(client.path_from_url(&url).as_deref(), Some("recipes/a.jpg"));
        assert_eq!(client.path_from_url("https://elsewhere.example/a.jpg"), None);
    }
}
