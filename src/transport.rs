use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::message::Message;

/// Body POSTed to the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub history: Vec<Message>,
}

/// Ways a request can fail to produce a response body
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("backend returned status {0}")]
    Status(StatusCode),
    #[error("network error: {0}")]
    Network(String),
    #[error("could not decode response body: {0}")]
    Decode(String),
    #[error("invalid endpoint {endpoint}: {reason}")]
    Endpoint { endpoint: String, reason: String },
}

/// Request/response mechanism used to reach the inference backend
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one chat request and return the decoded JSON body
    async fn send(&self, request: &ChatRequest) -> Result<serde_json::Value, TransportError>;
}

/// Transport that talks JSON over HTTP to the configured endpoint
#[derive(Clone)]
pub struct HttpTransport {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| TransportError::Endpoint {
            endpoint: config.endpoint.clone(),
            reason: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sibling `health` route of the chat endpoint (`.../chat` and `.../chat/` become `.../health`)
    pub fn health_url(&self) -> Result<Url, TransportError> {
        let mut base = self.endpoint.clone();
        let path = base.path().trim_end_matches('/').to_string();
        base.set_path(&path);

        base.join("health")
            .map_err(|e| TransportError::Endpoint {
                endpoint: self.endpoint.to_string(),
                reason: e.to_string(),
            })
    }

    /// Ask the backend whether it is up; returns its reported status string
    pub async fn health(&self) -> Result<String, TransportError> {
        let url = self.health_url()?;
        tracing::debug!(%url, "checking backend health");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        Ok(body
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown")
            .to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<serde_json::Value, TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status));
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP exchange, returning the raw request body that was received
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];

            let header_end = loop {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                if let Some(pos) = received.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                if n == 0 {
                    break received.len();
                }
            };

            let headers = String::from_utf8_lossy(&received[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);

            while received.len() < header_end + content_length {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            String::from_utf8_lossy(&received[header_end..]).to_string()
        });

        (format!("http://{addr}/chat"), handle)
    }

    fn transport_for(endpoint: &str) -> HttpTransport {
        let config = Config {
            endpoint: endpoint.to_string(),
            request_timeout_secs: 5,
            ..Config::default()
        };
        HttpTransport::new(&config).unwrap()
    }

    fn sample_request() -> ChatRequest {
        let user = Message::user("hi");
        ChatRequest {
            message: "hi".to_string(),
            history: vec![Message::assistant("hello"), user],
        }
    }

    #[tokio::test]
    async fn posts_message_and_history() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"answer":"X"}"#).await;
        let transport = transport_for(&url);
        let request = sample_request();

        let body = transport.send(&request).await.unwrap();
        assert_eq!(body["answer"], "X");

        let sent: ChatRequest = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(sent, request);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, _server) = serve_once("HTTP/1.1 503 Service Unavailable", "{}").await;
        let transport = transport_for(&url);

        let err = transport.send(&sample_request()).await.unwrap_err();
        assert!(matches!(err, TransportError::Status(s) if s == StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let (url, _server) = serve_once("HTTP/1.1 200 OK", "not json").await;
        let transport = transport_for(&url);

        let err = transport.send(&sample_request()).await.unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = transport_for(&format!("http://{addr}/chat"));
        let err = transport.send(&sample_request()).await.unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }

    #[tokio::test]
    async fn health_reports_backend_status() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", r#"{"status":"ok"}"#).await;
        let transport = transport_for(&url);

        assert_eq!(transport.health().await.unwrap(), "ok");
        server.await.unwrap();
    }

    #[test]
    fn health_url_replaces_last_segment() {
        let transport = transport_for("https://example.test/api/chat");
        assert_eq!(
            transport.health_url().unwrap().as_str(),
            "https://example.test/api/health"
        );
    }

    #[test]
    fn health_url_ignores_trailing_slash() {
        let transport = transport_for("https://example.test/chat/");
        assert_eq!(
            transport.health_url().unwrap().as_str(),
            "https://example.test/health"
        );

        let root = transport_for("http://127.0.0.1:8000/");
        assert_eq!(
            root.health_url().unwrap().as_str(),
            "http://127.0.0.1:8000/health"
        );
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        let config = Config {
            endpoint: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            HttpTransport::new(&config),
            Err(TransportError::Endpoint { .. })
        ));
    }
}
