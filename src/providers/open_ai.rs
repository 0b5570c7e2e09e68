use crate::config::LlmConfig;
use crate::error::ExtractionError;
use crate::model::Draft;
use crate::providers::{
    draft_schema, LlmProvider, IMAGE_EXTRACTION_PROMPT, SCHEMA_NAME, TEXT_EXTRACTION_PROMPT,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Provider for any OpenAI-compatible chat completions endpoint (OpenAI, OpenRouter, ...).
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    /// Built once; every request carries the same strict schema.
    response_format: Value,
}

impl OpenAIProvider {
    /// Create a new provider from configuration
    pub fn new(config: &LlmConfig) -> Result<Self, ExtractionError> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            ExtractionError::Config("LLM_PROVIDER_API_KEY not found in config or environment".into())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| ExtractionError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(OpenAIProvider {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            response_format: response_format()?,
        })
    }

    #[doc(hidden)]
    pub fn with_base_url(
        api_key: String,
        base_url: String,
        model: String,
    ) -> Result<Self, ExtractionError> {
        let mut config = LlmConfig::new(model, api_key);
        config.base_url = base_url;
        Self::new(&config)
    }

    fn request_body(&self, system_prompt: &str, user_message: Value) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                user_message
            ],
            "response_format": self.response_format
        });

        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        body
    }

    async fn complete(&self, body: Value) -> Result<Draft, ExtractionError> {
        debug!("Sending extraction request to {} ({})", self.base_url, self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ExtractionError::Api { status, body: text });
        }

        let response_body: Value = serde_json::from_str(&text)?;
        debug!("{:?}", response_body);

        let message = &response_body["choices"][0]["message"];
        if let Some(refusal) = message["refusal"].as_str() {
            return Err(ExtractionError::Refused(refusal.to_string()));
        }

        let content = message["content"]
            .as_str()
            .ok_or(ExtractionError::MissingContent)?;

        Ok(serde_json::from_str(content)?)
    }
}

fn response_format() -> Result<Value, ExtractionError> {
    let schema = draft_schema()?;
    Ok(json!({
        "type": "json_schema",
        "json_schema": {
            "name": SCHEMA_NAME,
            "schema": schema,
            "strict": true
        }
    }))
}

fn image_data_uri(image: &[u8], mime_type: &str) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(image))
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn format_from_text(&self, text: &str) -> Result<Draft, ExtractionError> {
        let body = self.request_body(
            TEXT_EXTRACTION_PROMPT,
            json!({ "role": "user", "content": text }),
        );
        self.complete(body).await
    }

    async fn format_from_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<Draft, ExtractionError> {
        debug!("Extracting recipe from {} image ({} bytes)", mime_type, image.len());

        let body = self.request_body(
            IMAGE_EXTRACTION_PROMPT,
            json!({
                "role": "user",
                "content": [{
                    "type": "image_url",
                    "image_url": {
                        "url": image_data_uri(image, mime_type),
                        "detail": "high"
                    }
                }]
            }),
        );
        self.complete(body).await
    }
}
