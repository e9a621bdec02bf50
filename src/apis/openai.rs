use crate::apis::api_client::{ApiClient, CompletionOptions, Message, ToolCall, ToolDefinition};
use crate::errors::AppError;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use serde_json::{self, json, Value};
use tracing::debug;

use crate::config::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};

// OpenAI API Types
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponseChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIResponseChoice>,
}

pub struct OpenAIClient {
    client: ReqwestClient,
    model: String,
    api_base: String,
}

impl OpenAIClient {
    pub fn with_api_key(api_key: String, model: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))?,
        );

        let client = ReqwestClient::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            model: model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            api_base: DEFAULT_OPENAI_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different chat-completions URL (proxies, compatible servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn convert_messages(&self, messages: Vec<Message>) -> Vec<OpenAIMessage> {
        messages
            .into_iter()
            .map(|msg| {
                let tool_calls = msg.tool_calls.map(|calls| {
                    calls
                        .into_iter()
                        .map(|call| OpenAIToolCall {
                            id: call.id.unwrap_or_default(),
                            tool_type: "function".to_string(),
                            function: OpenAIFunctionCall {
                                name: call.name,
                                arguments: call.arguments.to_string(),
                            },
                        })
                        .collect::<Vec<_>>()
                });

                // An assistant turn that only carries tool calls has no text
                let content = if tool_calls.is_some() && msg.content.is_empty() {
                    None
                } else {
                    Some(msg.content)
                };

                OpenAIMessage {
                    role: msg.role,
                    content,
                    tool_calls,
                    tool_call_id: msg.tool_call_id,
                }
            })
            .collect()
    }

    fn convert_tool_definitions(&self, tools: Vec<ToolDefinition>) -> Vec<OpenAITool> {
        tools
            .into_iter()
            .map(|tool| OpenAITool {
                tool_type: "function".to_string(),
                function: OpenAIFunction {
                    name: tool.name,
                    description: tool.description,
                    parameters: tool.parameters,
                },
            })
            .collect()
    }

    fn build_request(&self, messages: Vec<Message>, options: CompletionOptions) -> OpenAIRequest {
        let mut request = OpenAIRequest {
            model: self.model.clone(),
            messages: self.convert_messages(messages),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            tools: None,
            tool_choice: None,
        };

        if let Some(tools) = options.tools {
            if !tools.is_empty() {
                request.tools = Some(self.convert_tool_definitions(tools));
                request.tool_choice = if options.require_tool_use {
                    Some("required".to_string())
                } else {
                    Some("auto".to_string())
                };
            }
        }

        request
    }
}

fn extract_tool_calls(message: &OpenAIMessage) -> Option<Vec<ToolCall>> {
    let calls = message
        .tool_calls
        .as_ref()?
        .iter()
        .map(|call| ToolCall {
            id: Some(call.id.clone()),
            name: call.function.name.clone(),
            // Models occasionally emit broken JSON; let the tool layer report missing args
            arguments: serde_json::from_str::<Value>(&call.function.arguments)
                .unwrap_or_else(|_| json!({})),
        })
        .collect::<Vec<_>>();

    if calls.is_empty() {
        None
    } else {
        Some(calls)
    }
}

#[async_trait]
impl ApiClient for OpenAIClient {
    async fn complete_with_tools(
        &self,
        messages: Vec<Message>,
        options: CompletionOptions,
    ) -> Result<(String, Option<Vec<ToolCall>>)> {
        let request = self.build_request(messages, options);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(&self.api_base)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::NetworkError(format!("Failed to send request to OpenAI: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::NetworkError(format!(
                "OpenAI API error: {} - {}",
                status, error_text
            ))
            .into());
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| AppError::NetworkError(format!("Failed to get response text: {}", e)))?;

        let openai_response: OpenAIResponse = serde_json::from_str(&response_text)
            .map_err(|e| AppError::LLMError(format!("Failed to parse OpenAI response: {}", e)))?;

        let first_choice = openai_response
            .choices
            .first()
            .ok_or_else(|| AppError::LLMError("No choices in OpenAI response".to_string()))?;

        let content = first_choice.message.content.clone().unwrap_or_default();
        Ok((content, extract_tool_calls(&first_choice.message)))
    }
}
