//! Model transport over HTTPS
//!
//! One request per compile, bounded by the client timeout. Failures map onto
//! the crate error kinds; nothing is retried automatically.

use crate::synthesis::request::SkillRequest;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Messages API endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// API key read from the environment. Never serialized or logged in full.
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> crate::Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(crate::Error::MissingCredential);
        }
        Ok(Self(key.trim().to_string()))
    }

    /// Read `ANTHROPIC_API_KEY`
    pub fn from_env() -> crate::Result<Self> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) => Self::new(key),
            Err(_) => Err(crate::Error::MissingCredential),
        }
    }

    /// Prefix and last four characters only
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 12 {
            return "****".to_string();
        }
        let head: String = chars[..7].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

/// Text returned by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub text: String,
    pub model: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Sends a prepared request to the model service
pub trait SkillTransport {
    fn send(&self, request: &SkillRequest) -> impl Future<Output = crate::Result<ModelResponse>> + Send;
}

impl<T: SkillTransport + Sync> SkillTransport for &T {
    fn send(&self, request: &SkillRequest) -> impl Future<Output = crate::Result<ModelResponse>> + Send {
        (**self).send(request)
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    content: Vec<ApiContentBlock>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Extract the document text from a successful response body
pub fn parse_response(body: &[u8]) -> crate::Result<ModelResponse> {
    let parsed: ApiResponse = serde_json::from_slice(body)
        .map_err(|e| crate::Error::Transport(format!("unexpected response format: {}", e)))?;
    let text: String = parsed
        .content
        .iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text.as_deref())
        .collect::<Vec<_>>()
        .join("\n");
    if text.trim().is_empty() {
        return Err(crate::Error::Transport("response contained no text".to_string()));
    }
    Ok(ModelResponse {
        text,
        model: parsed.model,
        input_tokens: parsed.usage.as_ref().map(|u| u.input_tokens),
        output_tokens: parsed.usage.as_ref().map(|u| u.output_tokens),
    })
}

/// Map a non-success status onto an error kind
pub fn status_error(
    status: StatusCode,
    retry_after: Option<u64>,
    body: &[u8],
    request: &SkillRequest,
) -> crate::Error {
    let detail = serde_json::from_slice::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).chars().take(200).collect());

    match status {
        StatusCode::TOO_MANY_REQUESTS => crate::Error::RateLimited { retry_after },
        StatusCode::PAYLOAD_TOO_LARGE => crate::Error::PayloadTooLarge {
            size: request.size(),
            limit: request.size().saturating_sub(1),
            suggested_max: request.image_count / 2,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => crate::Error::Transport(format!(
            "API rejected the credential ({}): {}; check {}",
            status, detail, API_KEY_ENV
        )),
        _ => crate::Error::Transport(format!("API returned {}: {}", status, detail)),
    }
}

/// Anthropic Messages API client
#[derive(Debug, Clone)]
pub struct AnthropicTransport {
    client: Client,
    endpoint: String,
    credential: Credential,
}

impl AnthropicTransport {
    pub fn new(credential: Credential, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::Error::Transport(e.to_string()))?;
        Ok(Self { client, endpoint: DEFAULT_ENDPOINT.to_string(), credential })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl SkillTransport for AnthropicTransport {
    async fn send(&self, request: &SkillRequest) -> crate::Result<ModelResponse> {
        info!(model = %request.model, bytes = request.size(), "Sending request to model API");

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", self.credential.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    crate::Error::Transport("request timed out".to_string())
                } else {
                    crate::Error::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response
            .bytes()
            .await
            .map_err(|e| crate::Error::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(%status, "Model API returned an error");
            return Err(status_error(status, retry_after, &body, request));
        }

        let parsed = parse_response(&body)?;
        debug!(
            input_tokens = ?parsed.input_tokens,
            output_tokens = ?parsed.output_tokens,
            "Model response received"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SkillRequest {
        SkillRequest { model: "m".into(), image_count: 10, body: vec![b'x'; 100] }
    }

    #[test]
    fn test_credential_masking() {
        let cred = Credential::new("sk-ant-REDACTED").unwrap();
        assert_eq!(cred.masked(), "sk-ant-...1234");
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("abcdefgh"));
        assert_eq!(Credential::new("short").unwrap().masked(), "****");
    }

    #[test]
    fn test_empty_credential_is_missing() {
        assert!(matches!(Credential::new("   "), Err(crate::Error::MissingCredential)));
    }

    #[test]
    fn test_parse_response_joins_text_blocks() {
        let body = br##"{
            "model": "claude-x",
            "content": [
                {"type": "text", "text": "# Skill"},
                {"type": "text", "text": "Step 1"}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 20}
        }"##;
        let parsed = parse_response(body).unwrap();
        assert_eq!(parsed.text, "# Skill\nStep 1");
        assert_eq!(parsed.model, "claude-x");
        assert_eq!(parsed.output_tokens, Some(20));
    }

    #[test]
    fn test_parse_response_without_text_fails() {
        let body = br#"{"content": []}"#;
        assert!(matches!(parse_response(body), Err(crate::Error::Transport(_))));
    }

    #[test]
    fn test_status_mapping() {
        let req = request();
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, Some(30), b"", &req),
            crate::Error::RateLimited { retry_after: Some(30) }
        ));
        assert!(matches!(
            status_error(StatusCode::PAYLOAD_TOO_LARGE, None, b"", &req),
            crate::Error::PayloadTooLarge { suggested_max: 5, .. }
        ));
        let err = status_error(
            StatusCode::UNAUTHORIZED,
            None,
            br#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
            &req,
        );
        match err {
            crate::Error::Transport(msg) => assert!(msg.contains("invalid x-api-key")),
            other => panic!("expected transport error, got {:?}", other),
        }
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, None, b"oops", &req),
            crate::Error::Transport(_)
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let cred = Credential::new("sk-ant-test-key-000000").unwrap();
        let transport = AnthropicTransport::new(cred, Duration::from_millis(500))
            .unwrap()
            .with_endpoint("http://127.0.0.1:1/v1/messages");
        let result = transport.send(&request()).await;
        assert!(matches!(result, Err(crate::Error::Transport(_))));
    }
}
