use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use covenant_core::category::Category;
use covenant_core::classifier::{Classifier, StrategyKind, StrategyOutput};
use covenant_core::config::LlmConfig;
use covenant_core::error::{CovenantError, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const TEMPERATURE: f32 = 0.1;

/// Contract classifier backed by the Anthropic Messages API.
pub struct LlmClassifier {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
    max_tokens: u32,
    max_input_chars: usize,
}

// ── Anthropic Messages API request/response types ──────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

// ── Model output ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LlmLabel {
    category: String,
    #[serde(default)]
    reason: Option<String>,
}

impl LlmClassifier {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CovenantError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_input_chars: config.max_input_chars,
        })
    }

    fn build_system_prompt() -> String {
        "You are a legal contract classification expert. Return only valid JSON.".to_string()
    }

    fn build_user_prompt(&self, text: &str) -> String {
        let categories = Category::ALL
            .iter()
            .map(|c| format!("- {}", c.description()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Analyze the following contract text and classify it into exactly one of these categories:\n\
             {categories}\n\n\
             Return ONLY a valid JSON object with the following structure:\n\
             {{\n  \"category\": \"exact category name from the list above\",\n  \
             \"reason\": \"brief explanation of about 20 words for your classification choice\"\n}}\n\n\
             Contract Text:\n{}",
            truncate_chars(text, self.max_input_chars)
        )
    }

    async fn call_anthropic(&self, text: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(CovenantError::UpstreamUnavailable(
                "ANTHROPIC_API_KEY is not configured".into(),
            ));
        }

        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: TEMPERATURE,
            system: Self::build_system_prompt(),
            messages: vec![Message {
                role: "user".to_string(),
                content: self.build_user_prompt(text),
            }],
        };

        tracing::debug!(
            model = %self.model,
            content_len = text.len(),
            "Sending classification request to Anthropic API"
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CovenantError::UpstreamUnavailable(format!("request timed out: {e}"))
                } else {
                    CovenantError::UpstreamUnavailable(format!("HTTP request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            tracing::warn!(retry_after_secs = ?retry_after_secs, "Anthropic API rate limited the request");
            return Err(CovenantError::UpstreamRateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            tracing::warn!(%status, body = %body, "Anthropic API returned an error");
            return Err(CovenantError::UpstreamUnavailable(format!(
                "Anthropic API returned status {status}"
            )));
        }

        let api_response: AnthropicResponse = response.json().await.map_err(|e| {
            CovenantError::UpstreamUnavailable(format!("failed to parse API response: {e}"))
        })?;

        let text = api_response
            .content
            .iter()
            .find_map(|block| {
                if block.block_type == "text" {
                    block.text.clone()
                } else {
                    None
                }
            })
            .ok_or_else(|| {
                CovenantError::UpstreamUnavailable("no text content block in API response".into())
            })?;

        tracing::debug!(
            stop_reason = ?api_response.stop_reason,
            response_len = text.len(),
            "Received classification response from Anthropic API"
        );

        Ok(text)
    }

    /// Pull the label and reason out of the model's reply. Tolerates code
    /// fences and prose around the JSON object; a reply that is not JSON at
    /// all is taken verbatim as the label.
    fn parse_llm_response(raw: &str) -> (String, Option<String>) {
        let cleaned = raw.trim();
        let candidate = match (cleaned.find('{'), cleaned.rfind('}')) {
            (Some(start), Some(end)) if start < end => &cleaned[start..=end],
            _ => cleaned,
        };

        match serde_json::from_str::<LlmLabel>(candidate) {
            Ok(parsed) => (parsed.category, parsed.reason),
            Err(e) => {
                tracing::warn!(raw = %cleaned, error = %e, "LLM reply is not the expected JSON");
                let label = cleaned
                    .trim_matches(|c: char| c == '`' || c == '"' || c.is_whitespace())
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .to_string();
                (label, None)
            }
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Llm
    }

    async fn classify(&self, text: &str) -> Result<StrategyOutput> {
        if text.trim().is_empty() {
            return Ok(StrategyOutput::abstain());
        }

        let raw = self.call_anthropic(text).await?;
        let (label, reason) = Self::parse_llm_response(&raw);

        tracing::info!(label = %label, "LLM classification received");

        Ok(StrategyOutput {
            label: Some(label),
            confidence: None,
            scores: Vec::new(),
            reason,
        })
    }
}
