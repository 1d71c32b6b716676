//! The text-generation boundary.
//!
//! Everything that needs a language model goes through [`Oracle`]: a prompt
//! goes in, text comes out. [`HttpOracle`] talks to any OpenAI-compatible
//! chat-completions endpoint and bounds every call with a timeout and a
//! small number of retries on transient failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

#[async_trait]
pub trait Oracle: Send + Sync {
    /// Send a prompt and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Oracle transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Oracle API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Malformed oracle response: {0}")]
    Malformed(String),

    #[error("Oracle not configured: {0}")]
    NotConfigured(String),
}

impl OracleError {
    /// Timeouts, connection failures, rate limiting and server errors are
    /// worth another attempt; everything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            OracleError::Timeout(_) | OracleError::Transport(_) => true,
            OracleError::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            OracleError::Malformed(_) | OracleError::NotConfigured(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.3,
            timeout: Duration::from_secs(60),
            max_retries: 1,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

pub struct HttpOracle {
    client: Client,
    config: OracleConfig,
}

impl HttpOracle {
    pub fn new(config: OracleConfig) -> Result<Self, OracleError> {
        if config.api_key.trim().is_empty() {
            return Err(OracleError::NotConfigured("API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(OracleError::Transport)?;

        Ok(Self { client, config })
    }

    async fn send_once(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let payload = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "temperature": self.config.temperature
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        // A body cut short or stalled is a transport failure, not bad JSON.
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let response_json: Value =
            serde_json::from_slice(&body).map_err(|e| OracleError::Malformed(e.to_string()))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| OracleError::Malformed("missing choices[0].message.content".into()))?;

        Ok(content.trim().to_string())
    }

    fn transport_error(&self, error: reqwest::Error) -> OracleError {
        if error.is_timeout() {
            OracleError::Timeout(self.config.timeout)
        } else {
            OracleError::Transport(error)
        }
    }
}

#[async_trait]
impl Oracle for HttpOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let mut attempt = 0;
        loop {
            debug!(
                model = %self.config.model,
                prompt_chars = prompt.len(),
                attempt,
                "Calling oracle"
            );
            match self.send_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, "Oracle call failed, retrying");
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Read one HTTP request (headers plus a Content-Length body).
    async fn read_request(stream: &mut TcpStream) {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            buffer.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buffer);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buffer.len() >= header_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    /// Write the given raw responses in order, one per connection.
    async fn raw_server(responses: Vec<String>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            for response in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                read_request(&mut stream).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (format!("http://{address}"), hits)
    }

    fn http_response(status: u16, content_length: usize, body: &str) -> String {
        format!(
            "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {content_length}\r\nConnection: close\r\n\r\n{body}"
        )
    }

    /// Serve the given (status, body) pairs in order, one per connection.
    async fn scripted_server(replies: Vec<(u16, String)>) -> (String, Arc<AtomicUsize>) {
        raw_server(
            replies
                .into_iter()
                .map(|(status, body)| http_response(status, body.len(), &body))
                .collect(),
        )
        .await
    }

    fn completion(content: &str) -> String {
        json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
            .to_string()
    }

    fn config(base_url: String) -> OracleConfig {
        OracleConfig {
            api_key: "test-key".to_string(),
            base_url,
            timeout: Duration::from_millis(500),
            retry_backoff: Duration::from_millis(10),
            ..OracleConfig::default()
        }
    }

    #[tokio::test]
    async fn returns_trimmed_content() {
        let (url, hits) = scripted_server(vec![(200, completion("  CORE_IDEA \n"))]).await;
        let oracle = HttpOracle::new(config(url)).unwrap();

        assert_eq!(oracle.complete("classify").await.unwrap(), "CORE_IDEA");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_once_on_server_error() {
        let (url, hits) = scripted_server(vec![
            (503, "{\"error\":\"overloaded\"}".to_string()),
            (200, completion("recovered")),
        ])
        .await;
        let oracle = HttpOracle::new(config(url)).unwrap();

        assert_eq!(oracle.complete("hello").await.unwrap(), "recovered");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let (url, hits) = scripted_server(vec![
            (401, "{\"error\":\"bad key\"}".to_string()),
            (200, completion("unreachable")),
        ])
        .await;
        let oracle = HttpOracle::new(config(url)).unwrap();

        let err = oracle.complete("hello").await.unwrap_err();
        assert!(matches!(err, OracleError::Api { status: 401, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_content_is_malformed() {
        let (url, _) = scripted_server(vec![(200, "{\"choices\":[]}".to_string())]).await;
        let oracle = HttpOracle::new(config(url)).unwrap();

        let err = oracle.complete("hello").await.unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn truncated_body_is_retried() {
        let (url, hits) = raw_server(vec![
            http_response(200, 400, "{\"choices\":"),
            http_response(200, completion("whole").len(), &completion("whole")),
        ])
        .await;
        let oracle = HttpOracle::new(config(url)).unwrap();

        assert_eq!(oracle.complete("hello").await.unwrap(), "whole");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn truncated_body_without_retries_is_a_transport_failure() {
        let (url, _) = raw_server(vec![http_response(200, 400, "{\"choices\":")]).await;
        let oracle = HttpOracle::new(OracleConfig {
            max_retries: 0,
            ..config(url)
        })
        .unwrap();

        let err = oracle.complete("hello").await.unwrap_err();
        assert!(err.is_retryable(), "got {err:?}");
        assert!(!matches!(err, OracleError::Malformed(_)));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let oracle = HttpOracle::new(OracleConfig {
            timeout: Duration::from_millis(150),
            max_retries: 0,
            ..config(format!("http://{address}"))
        })
        .unwrap();

        let err = oracle.complete("hello").await.unwrap_err();
        assert!(matches!(err, OracleError::Timeout(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let result = HttpOracle::new(OracleConfig::default());
        assert!(matches!(result, Err(OracleError::NotConfigured(_))));
    }
}
