use std::time::{Duration, Instant};

use reqwest::Client;

use crate::config::ProbeConfig;
use crate::dispatch::{ChatCompletion, ChatRequest, CompletionResponse};
use crate::error::ProbeError;

/// Largest body accepted. Checked after reqwest has buffered the body,
/// so it bounds what gets parsed and printed, not what gets read.
const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024; // 2MB

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Thin chat-completion client. Cheap to clone; clones share the
/// connection pool and the read-only endpoint/credential.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let mut builder = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: completions_url(&config.base_url),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one chat completion. No retries: the first failure is returned.
    pub async fn chat_completion(
        &self,
        req: &ChatRequest,
    ) -> Result<CompletionResponse, ProbeError> {
        let start = Instant::now();
        tracing::debug!(model = %req.model, max_tokens = req.max_tokens, "sending chat completion");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProbeError::RateLimited {
                status: status.as_u16(),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ProbeError::AuthFailed {
                message: format!("{status}"),
            });
        }

        // Error bodies are truncated to MAX_RESPONSE_BYTES after buffering
        if !status.is_success() {
            let error_bytes = response
                .bytes()
                .await
                .unwrap_or_else(|e| format!("<body unreadable: {e}>").into());
            let truncated = &error_bytes[..error_bytes.len().min(MAX_RESPONSE_BYTES)];
            let text = String::from_utf8_lossy(truncated);
            return Err(ProbeError::Upstream {
                message: format!("{status}: {text}"),
                status: Some(status.as_u16()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| ProbeError::Upstream {
            message: format!("failed to read response body: {e}"),
            status: None,
        })?;

        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(ProbeError::Upstream {
                message: format!(
                    "response too large: {} bytes (max {})",
                    bytes.len(),
                    MAX_RESPONSE_BYTES
                ),
                status: None,
            });
        }

        let response = parse_completion(&bytes)?;

        tracing::debug!(
            requested = %req.model,
            served_by = %response.completion.model,
            latency_ms = start.elapsed().as_millis() as u64,
            "chat completion finished"
        );

        Ok(response)
    }
}

/// `base_url` + `/chat/completions`, tolerating a trailing slash.
pub fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Parse a completion body, keeping the raw JSON alongside the typed view.
pub fn parse_completion(bytes: &[u8]) -> Result<CompletionResponse, ProbeError> {
    let raw: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| ProbeError::SchemaParse(format!("response is not JSON: {e}")))?;
    let completion: ChatCompletion = serde_json::from_value(raw.clone())
        .map_err(|e| ProbeError::SchemaParse(format!("failed to parse response: {e}")))?;

    if completion.choices.is_empty() {
        return Err(ProbeError::SchemaParse("response has no choices".to_string()));
    }

    Ok(CompletionResponse { completion, raw })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_trims_trailing_slash() {
        assert_eq!(
            completions_url("http://localhost:4000"),
            "http://localhost:4000/chat/completions"
        );
        assert_eq!(
            completions_url("http://localhost:4000/v1/"),
            "http://localhost:4000/v1/chat/completions"
        );
    }

    #[test]
    fn parse_completion_rejects_empty_choices() {
        let err = parse_completion(br#"{"id":"x","model":"m","choices":[]}"#).unwrap_err();
        assert!(matches!(err, ProbeError::SchemaParse(_)));
    }

    #[test]
    fn parse_completion_keeps_raw_extras() {
        let body = br#"{"id":"x","model":"m","object":"chat.completion","choices":[{"message":{"role":"assistant","content":"ok"}}]}"#;
        let parsed = parse_completion(body).unwrap();
        assert_eq!(parsed.raw["object"], "chat.completion");
        assert_eq!(parsed.completion.model, "m");
    }
}
