//! Imagga Tagging Client
//!
//! Client for the Imagga v2 REST API. Raw bytes are staged through a
//! temporary file, uploaded to obtain an upload id and then queried on the
//! tags endpoint; URLs are queried directly.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use shared::{parse_tags, ImageSource, UploadEnvelope};
use tempfile::NamedTempFile;

use super::{ImageTagger, TaggingError};
use crate::config::ImaggaConfig;

/// Tags scored below this confidence are dropped by the provider
pub const TAG_CONFIDENCE_THRESHOLD: f64 = 30.0;

/// Client for the Imagga tagging API
#[derive(Clone)]
pub struct ImaggaClient {
    http_client: Client,
    tags_endpoint: String,
    uploads_endpoint: String,
    authorization: String,
    staging_dir: Option<PathBuf>,
}

/// What a tags query refers to
#[derive(Debug, Clone, Copy)]
enum TagTarget<'a> {
    Upload(&'a str),
    Url(&'a str),
}

impl TagTarget<'_> {
    fn query_param(&self) -> (&'static str, &str) {
        match self {
            TagTarget::Upload(id) => ("image_upload_id", id),
            TagTarget::Url(url) => ("image_url", url),
        }
    }
}

impl ImaggaClient {
    /// Create a new client from provider configuration
    pub fn new(config: &ImaggaConfig) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            tags_endpoint: config.tags_endpoint.clone(),
            uploads_endpoint: config.uploads_endpoint.clone(),
            authorization: format!(
                "Basic {}",
                basic_credentials(&config.api_key, &config.api_secret)
            ),
            staging_dir: config.staging_dir.clone(),
        })
    }

    /// Upload raw image bytes and return the provider's upload id
    pub async fn upload(&self, bytes: &[u8]) -> Result<String, TaggingError> {
        // Removed from disk when dropped, whichever way this function exits
        let staged = self.stage(bytes)?;
        let file_name = staged
            .path()
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image.tmp")
            .to_string();
        let file = tokio::fs::File::open(staged.path()).await?;

        let form = Form::new().part(
            "image",
            Part::stream_with_length(file, bytes.len() as u64).file_name(file_name),
        );

        let response = self
            .http_client
            .post(&self.uploads_endpoint)
            .header(AUTHORIZATION, &self.authorization)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TaggingError::UploadFailed(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TaggingError::UploadFailed(format!("Failed to read response: {}", e)))?;

        let envelope: UploadEnvelope = serde_json::from_slice(&body).map_err(|e| {
            TaggingError::UploadFailed(format!("API returned {} with unreadable body: {}", status, e))
        })?;

        if !status.is_success() {
            return Err(TaggingError::UploadFailed(format!(
                "API returned {}: {}",
                status,
                envelope.status_text().unwrap_or("no details")
            )));
        }

        let status_text = envelope.status_text().map(str::to_string);
        let upload_id = envelope.into_upload_id().ok_or_else(|| {
            TaggingError::UploadFailed(format!(
                "upload was not accepted: {}",
                status_text.as_deref().unwrap_or("no upload id returned")
            ))
        })?;

        tracing::debug!("Uploaded {} bytes as {}", bytes.len(), upload_id);
        Ok(upload_id)
    }

    /// Tags for a previously uploaded image
    pub async fn tags_for_upload(&self, upload_id: &str) -> Result<Vec<String>, TaggingError> {
        self.query_tags(TagTarget::Upload(upload_id)).await
    }

    /// Tags for an image the provider fetches itself
    pub async fn tags_for_url(&self, url: &str) -> Result<Vec<String>, TaggingError> {
        self.query_tags(TagTarget::Url(url)).await
    }

    async fn query_tags(&self, target: TagTarget<'_>) -> Result<Vec<String>, TaggingError> {
        let threshold = format!("{:.1}", TAG_CONFIDENCE_THRESHOLD);
        let (key, value) = target.query_param();

        let response = self
            .http_client
            .get(&self.tags_endpoint)
            .header(AUTHORIZATION, &self.authorization)
            .query(&[(key, value), ("threshold", threshold.as_str())])
            .send()
            .await
            .map_err(|e| TaggingError::QueryFailed(format!("Request failed: {}", e)))?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TaggingError::QueryFailed(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TaggingError::QueryFailed(format!("Failed to read response: {}", e)))?;

        let tags = parse_tags(&body);
        tracing::debug!("Provider returned {} tags for {:?}", tags.len(), target);
        Ok(tags)
    }

    fn stage(&self, bytes: &[u8]) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("image").suffix(".tmp");
        let mut staged = match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        staged.write_all(bytes)?;
        staged.flush()?;
        Ok(staged)
    }
}

#[async_trait]
impl ImageTagger for ImaggaClient {
    async fn detect_tags(&self, source: &ImageSource) -> Result<Vec<String>, TaggingError> {
        match source {
            ImageSource::Content(bytes) => {
                let upload_id = self.upload(bytes).await?;
                self.tags_for_upload(&upload_id).await
            }
            ImageSource::Url(url) => self.tags_for_url(url).await,
        }
    }
}

/// base64 of `key:secret`
pub fn basic_credentials(key: &str, secret: &str) -> String {
    BASE64.encode(format!("{}:{}", key, secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Multipart, Query, State},
        http::{HeaderMap, StatusCode},
        response::{Html, IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const KEY: &str = "acc_test";
    const SECRET: &str = "secret_test";

    #[derive(Default)]
    struct Recorded {
        uploads: Mutex<Vec<(Option<String>, Option<String>, Vec<u8>)>>,
        queries: Mutex<Vec<(Option<String>, HashMap<String, String>)>>,
    }

    struct FakeProvider {
        upload_reply: (StatusCode, Value),
        upload_html: Option<(StatusCode, &'static str)>,
        tags_reply: (StatusCode, Value),
        tags_delay: Duration,
        recorded: Recorded,
    }

    fn auth_header(headers: &HeaderMap) -> Option<String> {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    async fn fake_upload(
        State(provider): State<Arc<FakeProvider>>,
        headers: HeaderMap,
        mut multipart: Multipart,
    ) -> Response {
        while let Some(field) = multipart.next_field().await.unwrap() {
            if field.name() == Some("image") {
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await.unwrap().to_vec();
                provider
                    .recorded
                    .uploads
                    .lock()
                    .unwrap()
                    .push((auth_header(&headers), file_name, data));
            }
        }
        if let Some((status, page)) = provider.upload_html {
            return (status, Html(page)).into_response();
        }
        let (status, body) = provider.upload_reply.clone();
        (status, Json(body)).into_response()
    }

    async fn fake_tags(
        State(provider): State<Arc<FakeProvider>>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        provider
            .recorded
            .queries
            .lock()
            .unwrap()
            .push((auth_header(&headers), params));
        tokio::time::sleep(provider.tags_delay).await;
        let (status, body) = provider.tags_reply.clone();
        (status, Json(body))
    }

    async fn spawn_provider(provider: FakeProvider) -> (String, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        let app = Router::new()
            .route("/v2/uploads", post(fake_upload))
            .route("/v2/tags", get(fake_tags))
            .with_state(provider.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (format!("http://{}", addr), provider)
    }

    fn fake(upload_reply: (StatusCode, Value), tags_reply: (StatusCode, Value)) -> FakeProvider {
        FakeProvider {
            upload_reply,
            upload_html: None,
            tags_reply,
            tags_delay: Duration::ZERO,
            recorded: Recorded::default(),
        }
    }

    fn client_for(base: &str, staging_dir: Option<PathBuf>) -> ImaggaClient {
        let mut config = ImaggaConfig::new(KEY, SECRET);
        config.tags_endpoint = format!("{}/v2/tags", base);
        config.uploads_endpoint = format!("{}/v2/uploads", base);
        config.timeout_secs = 1;
        config.staging_dir = staging_dir;
        ImaggaClient::new(&config).unwrap()
    }

    fn dog_and_cat() -> Value {
        json!({
            "status": {"type": "success", "text": ""},
            "result": {"tags": [
                {"confidence": 80.2, "tag": {"en": "dog"}},
                {"confidence": 41.0, "tag": {"en": "cat"}}
            ]}
        })
    }

    fn upload_ok() -> Value {
        json!({"status": {"type": "success"}, "result": {"upload_id": "up_42"}})
    }

    fn expected_auth() -> String {
        format!("Basic {}", BASE64.encode(format!("{}:{}", KEY, SECRET)))
    }

    fn staged_files(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[test]
    fn test_basic_credentials() {
        assert_eq!(basic_credentials("key", "secret"), "a2V5OnNlY3JldA==");
    }

    #[tokio::test]
    async fn test_url_is_queried_directly() {
        let (base, provider) =
            spawn_provider(fake((StatusCode::OK, upload_ok()), (StatusCode::OK, dog_and_cat())))
                .await;
        let client = client_for(&base, None);

        let tags = client
            .detect_tags(&ImageSource::Url("http://x/y.jpg?size=large&v=2".into()))
            .await
            .unwrap();

        assert_eq!(tags, vec!["dog", "cat"]);
        assert!(provider.recorded.uploads.lock().unwrap().is_empty());
        let queries = provider.recorded.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        let (auth, params) = &queries[0];
        assert_eq!(auth.as_deref(), Some(expected_auth().as_str()));
        assert_eq!(params["image_url"], "http://x/y.jpg?size=large&v=2");
        assert_eq!(params["threshold"], "30.0");
        assert!(!params.contains_key("image_upload_id"));
    }

    #[tokio::test]
    async fn test_content_is_uploaded_then_queried() {
        let staging = tempfile::tempdir().unwrap();
        let (base, provider) =
            spawn_provider(fake((StatusCode::OK, upload_ok()), (StatusCode::OK, dog_and_cat())))
                .await;
        let client = client_for(&base, Some(staging.path().to_path_buf()));

        let tags = client
            .detect_tags(&ImageSource::Content(b"\x89PNG fake".to_vec()))
            .await
            .unwrap();

        assert_eq!(tags, vec!["dog", "cat"]);
        {
            let uploads = provider.recorded.uploads.lock().unwrap();
            assert_eq!(uploads.len(), 1);
            let (auth, file_name, data) = &uploads[0];
            assert_eq!(auth.as_deref(), Some(expected_auth().as_str()));
            assert!(file_name.as_deref().is_some_and(|n| n.starts_with("image")));
            assert_eq!(data.as_slice(), b"\x89PNG fake");
        }
        {
            let queries = provider.recorded.queries.lock().unwrap();
            let (_, params) = &queries[0];
            assert_eq!(params["image_upload_id"], "up_42");
            assert_eq!(params["threshold"], "30.0");
            assert!(!params.contains_key("image_url"));
        }
        assert_eq!(staged_files(&staging), 0);
    }

    #[tokio::test]
    async fn test_rejected_upload_fails_and_cleans_up() {
        let staging = tempfile::tempdir().unwrap();
        let (base, provider) = spawn_provider(fake(
            (StatusCode::OK, json!({"status": {"type": "error", "text": "bad file"}})),
            (StatusCode::OK, dog_and_cat()),
        ))
        .await;
        let client = client_for(&base, Some(staging.path().to_path_buf()));

        let err = client
            .detect_tags(&ImageSource::Content(vec![1, 2, 3]))
            .await
            .unwrap_err();

        assert!(matches!(err, TaggingError::UploadFailed(_)));
        assert!(provider.recorded.queries.lock().unwrap().is_empty());
        assert_eq!(staged_files(&staging), 0);
    }

    #[tokio::test]
    async fn test_html_error_page_on_upload_fails_and_cleans_up() {
        let staging = tempfile::tempdir().unwrap();
        let mut gateway = fake((StatusCode::OK, upload_ok()), (StatusCode::OK, dog_and_cat()));
        gateway.upload_html = Some((
            StatusCode::BAD_GATEWAY,
            "<html><body><h1>502 Bad Gateway</h1></body></html>",
        ));
        let (base, provider) = spawn_provider(gateway).await;
        let client = client_for(&base, Some(staging.path().to_path_buf()));

        let err = client
            .detect_tags(&ImageSource::Content(vec![1, 2, 3]))
            .await
            .unwrap_err();

        match err {
            TaggingError::UploadFailed(detail) => assert!(detail.contains("502")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(provider.recorded.uploads.lock().unwrap().len(), 1);
        assert!(provider.recorded.queries.lock().unwrap().is_empty());
        assert_eq!(staged_files(&staging), 0);
    }

    #[tokio::test]
    async fn test_upload_without_id_fails() {
        let (base, _provider) = spawn_provider(fake(
            (StatusCode::OK, json!({"status": {"type": "success"}, "result": {}})),
            (StatusCode::OK, dog_and_cat()),
        ))
        .await;
        let client = client_for(&base, None);

        let err = client.upload(b"abc").await.unwrap_err();
        assert!(matches!(err, TaggingError::UploadFailed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_provider_fails_upload_and_cleans_up() {
        let staging = tempfile::tempdir().unwrap();
        // Bind then drop to get a port nobody listens on
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let client = client_for(&format!("http://{}", addr), Some(staging.path().to_path_buf()));

        let err = client.upload(b"abc").await.unwrap_err();
        assert!(matches!(err, TaggingError::UploadFailed(_)));
        assert_eq!(staged_files(&staging), 0);
    }

    #[tokio::test]
    async fn test_missing_staging_dir_is_staging_error() {
        let client = client_for(
            "http://127.0.0.1:9",
            Some(PathBuf::from("/nonexistent/staging/dir")),
        );
        let err = client.upload(b"abc").await.unwrap_err();
        assert!(matches!(err, TaggingError::Staging(_)));
    }

    #[tokio::test]
    async fn test_non_ok_query_fails() {
        let (base, _provider) = spawn_provider(fake(
            (StatusCode::OK, upload_ok()),
            (
                StatusCode::FORBIDDEN,
                json!({"status": {"type": "error", "text": "bad credentials"}}),
            ),
        ))
        .await;
        let client = client_for(&base, None);

        let err = client.tags_for_url("http://x/y.jpg").await.unwrap_err();
        assert!(matches!(err, TaggingError::QueryFailed(_)));
    }

    #[tokio::test]
    async fn test_slow_query_times_out() {
        let mut slow = fake((StatusCode::OK, upload_ok()), (StatusCode::OK, dog_and_cat()));
        slow.tags_delay = Duration::from_secs(3);
        let (base, _provider) = spawn_provider(slow).await;
        let client = client_for(&base, None);

        let err = client.tags_for_url("http://x/y.jpg").await.unwrap_err();
        assert!(matches!(err, TaggingError::QueryFailed(_)));
    }

    #[tokio::test]
    async fn test_failed_status_with_ok_code_yields_no_tags() {
        let (base, _provider) = spawn_provider(fake(
            (StatusCode::OK, upload_ok()),
            (StatusCode::OK, json!({"status": {"type": "error"}})),
        ))
        .await;
        let client = client_for(&base, None);

        let tags = client.tags_for_url("http://x/y.jpg").await.unwrap();
        assert!(tags.is_empty());
    }
}
