//! OpenAI chat completions client with structured output

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::schema::ResponseSchema;
use super::LanguageModel;
use crate::config::LlmConfig;
use crate::error::{check_response, Error, Result};

pub struct OpenAiClient {
    api_key: String,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    http: reqwest::Client,
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct StructuredRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            http: reqwest::Client::new(),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| Error::Config(format!("invalid API key: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn request<'a>(
        &'a self,
        instruction: &'a str,
        input: &'a str,
        schema: &ResponseSchema,
    ) -> StructuredRequest<'a> {
        StructuredRequest {
            model: &self.model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: instruction,
                },
                WireMessage {
                    role: "user",
                    content: input,
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: schema.schema_name(),
                    strict: schema.is_strict_compatible(),
                    schema: schema.json_schema(),
                },
            },
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn structured(
        &self,
        instruction: &str,
        input: &str,
        schema: &ResponseSchema,
    ) -> Result<Value> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.request(instruction, input, schema);

        debug!(model = %self.model, format = %schema.name, "structured output request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        let chat: ChatResponse = check_response(response).await?.json().await?;
        parse_content(chat)
    }
}

fn parse_content(chat: ChatResponse) -> Result<Value> {
    let message = chat
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| Error::Model("no choices in response".to_string()))?;

    if let Some(refusal) = message.refusal {
        return Err(Error::Model(format!("model refused: {}", refusal)));
    }

    let content = message
        .content
        .ok_or_else(|| Error::Model("empty response content".to_string()))?;
    Ok(serde_json::from_str(&content)?)
}
