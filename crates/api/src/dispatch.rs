use std::sync::Arc;

use futures::StreamExt;
use reqwest::header::HeaderValue;
use reqwest::Method;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::client::ClientConfig;
use crate::error::Result;
use crate::response::ResponseEnvelope;
use crate::transport::{HttpTransport, RequestBody, Transport, TransportRequest, Upload};

/// Multipart field carrying uploaded files.
const UPLOAD_FIELD: &str = "file";

/// Executes single HTTP exchanges and wraps every response in an envelope.
///
/// Statuses are not interpreted here: 4xx and 5xx responses are returned as
/// envelopes like any other. Only transport failures become `Err`. Every
/// call is one attempt.
#[derive(Clone)]
pub struct RequestDispatcher {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl RequestDispatcher {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.user_agent())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET with JSON negotiation.
    pub async fn fetch(&self, target: &str) -> Result<ResponseEnvelope> {
        self.exchange(Method::GET, target, RequestBody::Empty, true)
            .await
    }

    /// POST with a JSON body.
    pub async fn submit<B: Serialize + ?Sized>(
        &self,
        target: &str,
        body: &B,
    ) -> Result<ResponseEnvelope> {
        let body = RequestBody::Json(serde_json::to_vec(body)?);
        self.exchange(Method::POST, target, body, true).await
    }

    /// POST without a body, for action endpoints.
    pub async fn submit_empty(&self, target: &str) -> Result<ResponseEnvelope> {
        self.exchange(Method::POST, target, RequestBody::Empty, true)
            .await
    }

    /// PUT with a JSON body.
    pub async fn replace<B: Serialize + ?Sized>(
        &self,
        target: &str,
        body: &B,
    ) -> Result<ResponseEnvelope> {
        let body = RequestBody::Json(serde_json::to_vec(body)?);
        self.exchange(Method::PUT, target, body, true).await
    }

    pub async fn remove(&self, target: &str) -> Result<ResponseEnvelope> {
        self.exchange(Method::DELETE, target, RequestBody::Empty, true)
            .await
    }

    /// POST a multipart form whose single file part is streamed from
    /// `upload`.
    pub async fn upload_stream(&self, target: &str, upload: Upload) -> Result<ResponseEnvelope> {
        let body = RequestBody::Multipart {
            field: UPLOAD_FIELD.to_string(),
            upload,
        };
        self.exchange(Method::POST, target, body, false).await
    }

    /// GET without JSON negotiation. The body is spooled through a fresh
    /// temporary file, which is removed before returning.
    pub async fn download_raw(&self, target: &str) -> Result<ResponseEnvelope> {
        let request = self.prepare(Method::GET, target, RequestBody::Empty, false)?;
        debug!(method = "GET", url = %request.url, "Downloading raw content");

        let response = self.transport.send(request).await?;
        let status = response.status;

        let scratch = tempfile::Builder::new()
            .prefix("crucible-download-")
            .tempfile()?;
        let mut file = tokio::fs::File::create(scratch.path()).await?;
        let mut body = response.body;
        let mut written: u64 = 0;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        let content = tokio::fs::read(scratch.path()).await?;
        debug!(
            status = status.as_u16(),
            bytes = written,
            path = %scratch.path().display(),
            "Raw content downloaded"
        );
        scratch.close()?;

        let text = String::from_utf8_lossy(&content).into_owned();
        Ok(ResponseEnvelope::from_bytes(status, &content).with_raw_text(text))
    }

    async fn exchange(
        &self,
        method: Method,
        target: &str,
        body: RequestBody,
        json: bool,
    ) -> Result<ResponseEnvelope> {
        let request = self.prepare(method, target, body, json)?;
        let method = request.method.clone();
        let url = request.url.clone();
        debug!(method = %method, url = %url, "Sending request");

        let response = self.transport.send(request).await?;
        let status = response.status;
        let bytes = response.into_bytes().await?;

        debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            bytes = bytes.len(),
            "Received response"
        );

        Ok(ResponseEnvelope::from_bytes(status, &bytes))
    }

    fn prepare(
        &self,
        method: Method,
        target: &str,
        body: RequestBody,
        json: bool,
    ) -> Result<TransportRequest> {
        let url = self.config.url_for(target)?;
        let mut headers = self.config.headers(json)?;
        if matches!(body, RequestBody::Multipart { .. }) {
            headers.insert("x-atlassian-token", HeaderValue::from_static("no-check"));
        }

        Ok(TransportRequest {
            method,
            url,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::User;
    use crate::transport::TransportResponse;
    use async_trait::async_trait;
    use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    struct Seen {
        method: Method,
        url: String,
        headers: reqwest::header::HeaderMap,
        body: Option<Vec<u8>>,
        upload_name: Option<String>,
    }

    /// Replies with a canned status/body (or a connection error) and
    /// records what it was asked to send.
    struct FakeTransport {
        reply: std::result::Result<(StatusCode, Vec<u8>), String>,
        seen: Mutex<Vec<Seen>>,
    }

    impl FakeTransport {
        fn replying(status: StatusCode, body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok((status, body.as_bytes().to_vec())),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> Seen {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
            let (body, upload_name) = match request.body {
                RequestBody::Empty => (None, None),
                RequestBody::Json(bytes) => (Some(bytes), None),
                RequestBody::Multipart { upload, .. } => {
                    let mut content = Vec::new();
                    let mut stream = upload.content;
                    while let Some(chunk) = stream.next().await {
                        content.extend_from_slice(&chunk?);
                    }
                    (Some(content), Some(upload.file_name))
                }
            };
            self.seen.lock().unwrap().push(Seen {
                method: request.method,
                url: request.url.to_string(),
                headers: request.headers,
                body,
                upload_name,
            });

            match &self.reply {
                Ok((status, body)) => Ok(TransportResponse::from_bytes(*status, body.clone())),
                Err(message) => Err(ApiError::Transport(message.clone())),
            }
        }
    }

    fn dispatcher(transport: Arc<FakeTransport>) -> RequestDispatcher {
        let config = ClientConfig::new("http://crucible.test/fecru")
            .unwrap()
            .with_basic_auth("bob", "secret");
        RequestDispatcher::with_transport(config, transport)
    }

    #[tokio::test]
    async fn test_fetch_decodes_payload() {
        let transport = FakeTransport::replying(StatusCode::OK, r#"{"userName":"bob"}"#);
        let envelope = dispatcher(transport.clone())
            .fetch("/rest-service/users-v1/bob")
            .await
            .unwrap();

        let user: User = envelope.extract(StatusCode::OK).unwrap();
        assert_eq!(user.user_name, "bob");

        let seen = transport.last();
        assert_eq!(seen.method, Method::GET);
        assert_eq!(seen.url, "http://crucible.test/fecru/rest-service/users-v1/bob");
        assert_eq!(seen.headers[AUTHORIZATION], "Basic Ym9iOnNlY3JldA==");
        assert_eq!(seen.headers[ACCEPT], "application/json");
        assert!(seen.body.is_none());
    }

    #[tokio::test]
    async fn test_conflict_is_an_envelope_not_an_error() {
        let body = r#"{"reviewId":"CR-1","message":"blocked","failedConditions":[]}"#;
        let transport = FakeTransport::replying(StatusCode::CONFLICT, body);
        let envelope = dispatcher(transport)
            .submit_empty("/rest-service/reviews-v1/CR-1/complete")
            .await
            .unwrap();

        assert_eq!(envelope.status(), StatusCode::CONFLICT);
        assert!(envelope.extract::<serde_json::Value>(StatusCode::OK).is_none());
        let error = envelope.extract_error("unused");
        assert_eq!(error.message, "blocked");
        assert_eq!(
            serde_json::to_value(&error.details).unwrap(),
            json!({"reviewId": "CR-1", "failedConditions": []})
        );
    }

    #[tokio::test]
    async fn test_server_errors_resolve() {
        let transport = FakeTransport::replying(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        let envelope = dispatcher(transport)
            .remove("/rest-service/reviews-v1/CR-3")
            .await
            .unwrap();
        assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(envelope.extract_error("x").message, "boom");
    }

    #[tokio::test]
    async fn test_transport_failure_rejects() {
        let transport = FakeTransport::failing("connection refused");
        let result = dispatcher(transport)
            .fetch("/rest-service/reviews-v1")
            .await;
        let err = result.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_submit_and_replace_send_json() {
        let transport = FakeTransport::replying(StatusCode::OK, "");
        let dispatcher = dispatcher(transport.clone());

        dispatcher
            .submit("/rest-service/reviews-v1/CR-1/close", &json!({"summary": "done"}))
            .await
            .unwrap();
        let seen = transport.last();
        assert_eq!(seen.method, Method::POST);
        assert_eq!(seen.headers[CONTENT_TYPE], "application/json");
        assert_eq!(seen.body.unwrap(), br#"{"summary":"done"}"#.to_vec());

        let envelope = dispatcher
            .replace("/rest-service/reviews-v1/CR-1/comments/5", &json!({"message": "edit"}))
            .await
            .unwrap();
        assert_eq!(transport.last().method, Method::PUT);
        assert!(envelope.body().is_none());
    }

    #[tokio::test]
    async fn test_upload_stream_is_multipart() {
        let transport = FakeTransport::replying(StatusCode::OK, r#"{"toPath":"notes.txt"}"#);
        let envelope = dispatcher(transport.clone())
            .upload_stream(
                "/rest-service/reviews-v1/CR-1/addFile",
                Upload::from_bytes("notes.txt", "hello"),
            )
            .await
            .unwrap();

        let seen = transport.last();
        assert_eq!(seen.method, Method::POST);
        assert_eq!(seen.upload_name.as_deref(), Some("notes.txt"));
        assert_eq!(seen.body.unwrap(), b"hello".to_vec());
        assert_eq!(seen.headers["x-atlassian-token"], "no-check");
        assert!(seen.headers.get(CONTENT_TYPE).is_none());
        assert_eq!(envelope.body().unwrap()["toPath"], "notes.txt");
    }

    #[tokio::test]
    async fn test_download_raw_skips_json_negotiation() {
        let transport = FakeTransport::replying(StatusCode::OK, "fn main() {}\n");
        let envelope = dispatcher(transport.clone())
            .download_raw("/rest-service/repositories-v1/content/REPO/1/src/main.rs")
            .await
            .unwrap();

        let seen = transport.last();
        assert!(seen.headers.get(ACCEPT).is_none());
        assert!(seen.headers.get(AUTHORIZATION).is_some());

        let content: String = envelope.extract(StatusCode::OK).unwrap();
        assert_eq!(content, "fn main() {}\n");
    }

    #[tokio::test]
    async fn test_download_raw_decodes_json_content() {
        let text = "{\n  \"a\": [1, 2]\n}\n";
        let transport = FakeTransport::replying(StatusCode::OK, text);
        let envelope = dispatcher(transport)
            .download_raw("/rest-service/repositories-v1/content/REPO/1/data.json")
            .await
            .unwrap();
        assert_eq!(envelope.body(), Some(&json!({"a": [1, 2]})));
        assert_eq!(envelope.raw_text(), Some(text));
    }

    #[tokio::test]
    async fn test_download_raw_keeps_status() {
        let transport = FakeTransport::replying(StatusCode::NOT_FOUND, r#"{"code":"NotFound","message":"no such file"}"#);
        let envelope = dispatcher(transport)
            .download_raw("/rest-service/repositories-v1/content/REPO/1/missing")
            .await
            .unwrap();
        assert_eq!(envelope.status(), StatusCode::NOT_FOUND);
        assert!(envelope.extract::<String>(StatusCode::OK).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_downloads_do_not_collide() {
        let transport = FakeTransport::replying(StatusCode::OK, "same body");
        let dispatcher = dispatcher(transport);
        let targets: Vec<String> = (0..8)
            .map(|i| format!("/rest-service/repositories-v1/content/REPO/{i}/f"))
            .collect();

        let results = futures::future::join_all(
            targets.iter().map(|target| dispatcher.download_raw(target)),
        )
        .await;

        for result in results {
            let body: String = result.unwrap().extract(StatusCode::OK).unwrap();
            assert_eq!(body, "same body");
        }
    }
}
