use crate::prompt;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Minimal client for Ollama's `/api/generate` endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new(
            "http://localhost:11434".to_string(),
            "llama3".to_string(),
        )
    }
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single non-streaming completion in JSON mode at temperature 0.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
            options: GenerateOptions { temperature: 0.0 },
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending generate request");

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to reach Ollama at {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Ollama returned {} for model {}", status, self.model);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .context("Failed to decode Ollama response")?;

        Ok(body.response)
    }

    /// Generate until the reply looks like an extraction object, asking the
    /// model to repair its own output between attempts.
    pub async fn generate_json_with_retry(
        &self,
        prompt: &str,
        max_attempts: usize,
    ) -> Result<String> {
        let max_attempts = max_attempts.max(1);
        let mut response = self.generate(prompt).await?;

        for attempt in 1..=max_attempts {
            if looks_like_extraction(&response) {
                return Ok(response);
            }
            warn!(attempt, max_attempts, "LLM reply is not an extraction object");

            if attempt < max_attempts {
                response = self.generate(&prompt::build_retry_prompt(&response)).await?;
            }
        }

        anyhow::bail!("No valid extraction JSON after {} attempts", max_attempts)
    }
}

/// A JSON object carrying an `entities` array.
fn looks_like_extraction(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(crate::strip_code_fence(text))
        .map(|value| value.get("entities").is_some_and(|e| e.is_array()))
        .unwrap_or(false)
}
