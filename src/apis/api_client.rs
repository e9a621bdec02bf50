use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    // Set on role == "tool" so the provider can pair the result with its call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: String) -> Self {
        Self::plain("system", content)
    }

    pub fn user(content: String) -> Self {
        Self::plain("user", content)
    }

    pub fn assistant(content: String) -> Self {
        Self::plain("assistant", content)
    }

    pub fn assistant_with_tools(content: String, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            ..Self::plain("assistant", content)
        }
    }

    pub fn tool(tool_call_id: String, content: String) -> Self {
        Self {
            tool_call_id: Some(tool_call_id),
            ..Self::plain("tool", content)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: Option<String>, // Required for OpenAI to map tool results back to calls
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub require_tool_use: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.0),
            top_p: None,
            max_tokens: Some(4096),
            tools: None,
            require_tool_use: false,
        }
    }
}

/// A chat-completion backend able to return tool calls.
#[async_trait::async_trait]
pub trait ApiClient: Send + Sync {
    async fn complete_with_tools(
        &self,
        messages: Vec<Message>,
        options: CompletionOptions,
    ) -> Result<(String, Option<Vec<ToolCall>>)>;
}

pub type DynApiClient = Arc<dyn ApiClient>;
