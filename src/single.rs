use crate::config::ProbeConfig;
use crate::dispatch::http::ChatClient;
use crate::dispatch::{ChatRequest, CompletionResponse};
use crate::error::ProbeError;

/// One request, reported in full. No retry on failure.
pub struct SingleProbe {
    client: ChatClient,
    model: String,
    prompt: String,
    max_tokens: u64,
}

impl SingleProbe {
    pub fn new(client: ChatClient, config: &ProbeConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            prompt: config.single.prompt.clone(),
            max_tokens: config.single.max_tokens,
        }
    }

    pub fn request(&self) -> ChatRequest {
        ChatRequest::user(&self.model, &self.prompt, self.max_tokens)
    }

    pub async fn run(&self) -> Result<CompletionResponse, ProbeError> {
        let req = self.request();
        tracing::info!(endpoint = %self.client.endpoint(), model = %req.model, "sending single probe");

        let response = self.client.chat_completion(&req).await.inspect_err(|e| {
            tracing::warn!(status = ?e.status(), "single probe failed: {e}");
        })?;

        if let Some(usage) = response.completion.usage {
            if !usage.is_consistent() {
                tracing::warn!(?usage, "usage totals do not add up");
            }
            if usage.completion_tokens > self.max_tokens {
                tracing::warn!(
                    completion_tokens = usage.completion_tokens,
                    max_tokens = self.max_tokens,
                    "completion exceeded max_tokens"
                );
            }
        } else {
            tracing::warn!("response carried no usage block");
        }

        Ok(response)
    }
}
