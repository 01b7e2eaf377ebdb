//! The HTTP seam under the dispatcher.
//!
//! [`Transport`] executes one fully prepared request and hands back the
//! status plus a body stream. [`HttpTransport`] is the reqwest
//! implementation; tests substitute their own.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use tracing::debug;
use url::Url;

use crate::error::{ApiError, Result};

/// Chunked response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Chunked request body for uploads.
pub type UploadStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync>>;

/// A file streamed as one multipart form part.
pub struct Upload {
    pub file_name: String,
    pub content: UploadStream,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, content: UploadStream) -> Self {
        Self {
            file_name: file_name.into(),
            content,
        }
    }

    /// Upload of an in-memory buffer.
    pub fn from_bytes(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let chunk: std::io::Result<Bytes> = Ok(content.into());
        Self::new(file_name, Box::pin(stream::once(async move { chunk })))
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Vec<u8>),
    /// Multipart form with a single file part named `field`.
    Multipart { field: String, upload: Upload },
}

#[derive(Debug)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

pub struct TransportResponse {
    pub status: StatusCode,
    pub body: ByteStream,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: ByteStream) -> Self {
        Self { status, body }
    }

    /// Response with a fully buffered body.
    pub fn from_bytes(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        let chunks: Vec<std::io::Result<Bytes>> = if body.is_empty() {
            Vec::new()
        } else {
            vec![Ok(body)]
        };
        Self::new(status, Box::pin(stream::iter(chunks)))
    }

    /// Drains the body stream into memory.
    pub async fn into_bytes(self) -> Result<Vec<u8>> {
        let mut body = self.body;
        let mut buffer = Vec::new();
        while let Some(chunk) = body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer)
    }
}

impl fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a single attempt. Any HTTP response, whatever its status,
    /// is `Ok`; only failures to obtain a response are `Err`.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(ApiError::RequestFailed)?;

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let TransportRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method, url).headers(headers);
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(bytes) => builder.body(bytes),
            RequestBody::Multipart { field, upload } => {
                let part = reqwest::multipart::Part::stream(reqwest::Body::wrap_stream(
                    upload.content,
                ))
                .file_name(upload.file_name);
                builder.multipart(reqwest::multipart::Form::new().part(field, part))
            }
        };

        let response = builder.send().await.map_err(ApiError::RequestFailed)?;
        let status = response.status();
        debug!(status = status.as_u16(), "Received response headers");

        let body = response.bytes_stream().map_err(std::io::Error::other);
        Ok(TransportResponse::new(status, Box::pin(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buffered_response_drains() {
        let response = TransportResponse::from_bytes(StatusCode::OK, &b"{\"a\":1}"[..]);
        let bytes = response.into_bytes().await.unwrap();
        assert_eq!(bytes, b"{\"a\":1}");
    }

    #[tokio::test]
    async fn test_empty_response_has_no_chunks() {
        let response = TransportResponse::from_bytes(StatusCode::NO_CONTENT, Vec::new());
        assert!(response.into_bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stream_error_surfaces() {
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"par")),
            Err(std::io::Error::other("connection reset")),
        ];
        let response = TransportResponse::new(StatusCode::OK, Box::pin(stream::iter(chunks)));
        let err = response.into_bytes().await.unwrap_err();
        assert!(err.is_transport());
    }
}
