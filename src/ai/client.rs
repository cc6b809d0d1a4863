use super::prompts;
use crate::error::StudioError;
use serde_json::{json, Value};

pub const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const CLIENT_TITLE: &str = "Prompt Studio";
const TEMPERATURE: f64 = 0.6;

/// Models offered in the settings picker. Any other model id is accepted too.
pub const MODEL_CATALOG: &[(&str, &str)] = &[
    ("openai/gpt-4o-mini", "GPT-4o mini (fast, cheap)"),
    ("openai/gpt-4o", "GPT-4o (higher quality)"),
    ("anthropic/claude-3.5-sonnet", "Claude 3.5 Sonnet"),
    ("anthropic/claude-3.5-haiku", "Claude 3.5 Haiku (fast)"),
    ("deepseek/deepseek-chat", "DeepSeek Chat"),
];

/// Rewrites a draft prompt through a chat-completion endpoint. One request per call.
#[derive(Clone)]
pub struct RefinementClient {
    client: reqwest::Client,
    endpoint: String,
    referer: String,
}

impl RefinementClient {
    pub fn new(endpoint: impl Into<String>, referer: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            referer: referer.into(),
        }
    }

    pub async fn refine(&self, api_key: &str, model: &str, draft: &str) -> Result<String, StudioError> {
        let payload = json!({
            "model": model,
            "temperature": TEMPERATURE,
            "messages": [
                { "role": "system", "content": prompts::REFINE_SYSTEM_PROMPT },
                { "role": "user", "content": prompts::refine_user_prompt(draft) },
            ]
        });

        log::info!("Refining draft with model {model}");
        let res = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", CLIENT_TITLE)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            log::error!("Refinement request failed with status {status}");
            return Err(StudioError::Request { status: status.as_u16(), detail });
        }

        let body: Value = match res.json().await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Refinement response was not JSON: {e}");
                return Err(StudioError::EmptyResponse);
            }
        };
        extract_content(&body).ok_or(StudioError::EmptyResponse)
    }
}

fn extract_content(body: &Value) -> Option<String> {
    let text = body["choices"][0]["message"]["content"].as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}
