use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::{GenerateRequest, GenerateResponse, LlmError, Provider};

const API_VERSION: &str = "2023-06-01";
const WEB_SEARCH_TOOL_TYPE: &str = "web_search_20250305";

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct AnthropicTool {
    #[serde(rename = "type")]
    tool_type: String,
    name: String,
    max_uses: u32,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    model: String,
    usage: AnthropicUsage,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
    #[serde(default)]
    server_tool_use: Option<ServerToolUsage>,
}

#[derive(Deserialize)]
struct ServerToolUsage {
    #[serde(default)]
    web_search_requests: u32,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

fn build_request(req: &GenerateRequest) -> AnthropicRequest {
    let tools = req
        .web_search_max_uses
        .map(|max_uses| AnthropicTool {
            tool_type: WEB_SEARCH_TOOL_TYPE.to_string(),
            name: "web_search".to_string(),
            max_uses,
        })
        .into_iter()
        .collect();

    AnthropicRequest {
        model: req.model.clone(),
        max_tokens: req.max_tokens,
        system: req.system.clone(),
        messages: vec![AnthropicMessage {
            role: "user".to_string(),
            content: req.prompt.clone(),
        }],
        tools,
    }
}

/// Text blocks in order; tool-use and search-result blocks are skipped.
fn collect_text(content: &[AnthropicContent]) -> String {
    content
        .iter()
        .filter(|c| c.content_type == "text")
        .filter_map(|c| c.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}

#[async_trait::async_trait]
impl Provider for AnthropicProvider {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key).map_err(|e| LlmError::Status {
                status: 401,
                message: format!("invalid API key header: {e}"),
            })?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = build_request(req);

        let response = self
            .client
            .post(self.messages_url())
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<AnthropicError>(&error_body) {
                Ok(err) => err.error.message,
                Err(_) => error_body,
            };
            return Err(LlmError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let resp: AnthropicResponse = response.json().await?;

        Ok(GenerateResponse {
            content: collect_text(&resp.content),
            model: resp.model,
            input_tokens: resp.usage.input_tokens,
            output_tokens: resp.usage.output_tokens,
            web_search_requests: resp
                .usage
                .server_tool_use
                .map(|u| u.web_search_requests)
                .unwrap_or(0),
            cost_usd: 0.0,
            finish_reason: resp.stop_reason.unwrap_or_default(),
            provider: String::new(),
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
