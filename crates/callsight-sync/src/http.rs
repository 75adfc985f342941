//! HTTP client for the engagement feed endpoint.

use std::time::Duration;

use async_trait::async_trait;
use callsight_core::decode_body;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_TYPE};
use tracing::info;

use crate::{FetchError, RecordSource};

const FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Fetches the whole feed with a single GET.
pub struct FeedClient {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl FeedClient {
    /// Create a client for `url`, sending `token` as a bearer credential if given.
    pub fn new(url: String, token: Option<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            client,
            url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RecordSource for FeedClient {
    async fn fetch_body(&self) -> Result<String, FetchError> {
        info!(url = %self.url, "fetching engagement feed");
        // Compressed bodies have come back cut short; ask for identity encoding.
        let mut request = self
            .client
            .get(&self.url)
            .header(ACCEPT_ENCODING, "identity")
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await?;
        info!(bytes = bytes.len(), "fetched engagement feed");
        Ok(decode_body(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned HTTP response and hand back the raw request text.
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/feed", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                concat!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\n",
                    "content-length: {}\r\nconnection: close\r\n\r\n{}"
                ),
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
        });

        (url, rx)
    }

    #[tokio::test]
    async fn fetches_records_with_bearer_token() {
        let body = r#"{"data": [{"engagement_id": "e-1", "engagement_type": "dialer"}]}"#;
        let (url, request) = serve_once("200 OK", body).await;
        let client = FeedClient::new(url, Some("secret".into())).unwrap();

        let records = client.fetch().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), "e-1");

        let request = request.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("get /feed "));
        assert!(request.contains("authorization: bearer secret"));
        assert!(request.contains("accept-encoding: identity"));
    }

    #[tokio::test]
    async fn server_error_carries_status_and_body() {
        let (url, _request) = serve_once("503 Service Unavailable", "pipeline busy").await;
        let client = FeedClient::new(url, None).unwrap();

        match client.fetch_body().await {
            Err(FetchError::Server { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "pipeline busy");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn empty_token_is_dropped() {
        let client =
            FeedClient::new("http://localhost:9/feed".into(), Some(String::new())).unwrap();
        assert!(client.token.is_none());
        assert_eq!(client.url(), "http://localhost:9/feed");
    }
}
