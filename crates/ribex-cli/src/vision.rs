//! Gemini REST client for vision-model extraction.

use std::time::Duration;

use base64::Engine;
use serde_json::{json, Value};
use tracing::{debug, trace};

use ribex_core::models::config::VisionConfig;
use ribex_core::{Document, ModelReply, EXTRACTION_PROMPT};

/// Sends documents with the extraction prompt to a Gemini model.
pub struct GeminiClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl GeminiClient {
    /// Build a client, reading the API key from the configured environment
    /// variable.
    pub fn from_config(config: &VisionConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Missing API key: set the {} environment variable to use --vision",
                    config.api_key_env
                )
            })?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: format!(
                "{}/{}:generateContent",
                config.endpoint.trim_end_matches('/'),
                config.model
            ),
            api_key,
        })
    }

    /// Ask the model for the document's bank details.
    pub async fn extract(&self, document: &Document) -> ModelReply {
        debug!("Sending {} ({}) to {}", document.name, document.mime_type, self.url);
        match self.send(document).await {
            Ok(response) => classify_response(&response),
            Err(e) => ModelReply::Exception(e.to_string()),
        }
    }

    async fn send(&self, document: &Document) -> reqwest::Result<Value> {
        self.http
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body(document))
            .send()
            .await?
            .json::<Value>()
            .await
    }
}

/// Request payload: the prompt followed by the inline document.
pub fn request_body(document: &Document) -> Value {
    json!({
        "contents": [{
            "parts": [
                { "text": EXTRACTION_PROMPT },
                {
                    "inline_data": {
                        "mime_type": document.mime_type,
                        "data": base64::engine::general_purpose::STANDARD.encode(&document.bytes),
                    }
                }
            ]
        }]
    })
}

/// Classify a `generateContent` response.
pub fn classify_response(response: &Value) -> ModelReply {
    if let Some(error) = response.get("error") {
        return ModelReply::ApiError(pretty(error));
    }

    let Some(candidate) = response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    else {
        return ModelReply::NoCandidate(pretty(response));
    };

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    trace!("Model text: {}", text);
    ModelReply::Text(text)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
