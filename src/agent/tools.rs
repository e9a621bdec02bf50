use crate::apis::api_client::ToolDefinition;
use crate::config::Config;
use crate::tools::{
    composio::{ComposioParams, ComposioTool},
    datetime,
    python::{PythonParams, PythonTool},
    vapi::{VapiParams, VapiTool},
    ToolOutput,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

pub const COMPOSIO_TOOL: &str = "composio_tool";
pub const VAPI_TOOL: &str = "vapi_call";
pub const PYTHON_TOOL: &str = "python_execute";
pub const DATETIME_TOOL: &str = "get_datetime";
pub const TERMINATE_TOOL: &str = "terminate";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminateParams {
    #[serde(default = "default_terminate_status")]
    pub status: String,
}

fn default_terminate_status() -> String {
    "success".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tool", content = "params")]
pub enum ToolCall {
    Composio(ComposioParams),
    Vapi(VapiParams),
    PythonExecute(PythonParams),
    DateTime,
    Terminate(TerminateParams),
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Composio(_) => COMPOSIO_TOOL,
            ToolCall::Vapi(_) => VAPI_TOOL,
            ToolCall::PythonExecute(_) => PYTHON_TOOL,
            ToolCall::DateTime => DATETIME_TOOL,
            ToolCall::Terminate(_) => TERMINATE_TOOL,
        }
    }

    /// Tools whose completion ends the run.
    pub fn is_special(&self) -> bool {
        matches!(self, ToolCall::Terminate(_))
    }
}

pub fn parse_tool_call(name: &str, args: &Value) -> Result<ToolCall> {
    match name {
        COMPOSIO_TOOL => {
            let params = serde_json::from_value(args.clone())
                .context("Failed to parse composio_tool parameters")?;
            Ok(ToolCall::Composio(params))
        }
        VAPI_TOOL => {
            let params = serde_json::from_value(args.clone())
                .context("Failed to parse vapi_call parameters")?;
            Ok(ToolCall::Vapi(params))
        }
        PYTHON_TOOL => {
            let params = serde_json::from_value(args.clone())
                .context("Failed to parse python_execute parameters")?;
            Ok(ToolCall::PythonExecute(params))
        }
        DATETIME_TOOL => Ok(ToolCall::DateTime),
        TERMINATE_TOOL => {
            // Tolerate an empty or null argument object
            let args = if args.is_null() {
                serde_json::json!({})
            } else {
                args.clone()
            };
            let params =
                serde_json::from_value(args).context("Failed to parse terminate parameters")?;
            Ok(ToolCall::Terminate(params))
        }
        _ => Err(anyhow::anyhow!("Unknown tool: {}", name)),
    }
}

/// Every tool the agent can call, wired to its vendor clients.
pub struct ToolCollection {
    composio: ComposioTool,
    vapi: VapiTool,
    python: PythonTool,
}

impl ToolCollection {
    pub fn from_config(config: &Config) -> Self {
        Self {
            composio: ComposioTool::new(&config.composio),
            vapi: VapiTool::new(&config.vapi),
            python: PythonTool::new(
                config.python_interpreter.clone(),
                config.workspace_root.clone(),
                config.python_timeout_secs,
            ),
        }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        get_tool_definitions()
            .into_iter()
            .map(|def| ToolDefinition {
                name: def["name"].as_str().unwrap_or("").to_string(),
                description: def["description"].as_str().unwrap_or("").to_string(),
                parameters: def["parameters"].clone(),
            })
            .collect()
    }

    pub async fn execute(&self, call: &ToolCall) -> ToolOutput {
        info!("Activating tool: '{}'", call.name());
        match call {
            ToolCall::Composio(params) => self.composio.execute(params).await,
            ToolCall::Vapi(params) => self.vapi.execute(params).await,
            ToolCall::PythonExecute(params) => self.python.execute(params).await,
            ToolCall::DateTime => ToolOutput::success(datetime::current_datetime()),
            ToolCall::Terminate(params) => ToolOutput::success(format!(
                "The interaction has been completed with status: {}",
                params.status
            )),
        }
    }

    pub async fn cleanup(&self) {
        self.composio.reset().await;
    }
}

pub fn get_tool_definitions() -> Vec<Value> {
    vec![
        serde_json::json!({
            "name": COMPOSIO_TOOL,
            "description": "Access and execute tools from Composio's catalog of third-party integrations.\n\
                Usage:\n\
                - List tools: {\"action\": \"list_tools\", \"query\": \"optional search term\"}\n\
                - Tool details: {\"action\": \"get_tool_info\", \"tool_name\": \"github\"}\n\
                - Execute: {\"action\": \"execute\", \"tool_name\": \"github\", \"action_name\": \"create_issue\", \"parameters\": {...}}\n\
                Prefer Exa search actions for web searches.",
            "parameters": {
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["list_tools", "get_tool_info", "execute"],
                        "description": "List available tools, get info about a tool, or execute a tool action"
                    },
                    "query": {
                        "type": "string",
                        "description": "Optional search query when listing tools (e.g. 'email', 'github', 'calendar')"
                    },
                    "tool_name": {
                        "type": "string",
                        "description": "The tool to inspect or execute (e.g. 'github', 'gmail', 'slack')"
                    },
                    "action_name": {
                        "type": "string",
                        "description": "The action to execute for the tool (e.g. 'create_issue', 'send_email')"
                    },
                    "parameters": {
                        "type": "object",
                        "description": "Parameters for the tool action"
                    }
                },
                "required": ["action"]
            }
        }),
        serde_json::json!({
            "name": VAPI_TOOL,
            "description": "Make phone calls and hold voice conversations through Vapi.\n\
                Usage:\n\
                - Call: {\"action\": \"create_call\", \"phone_number\": \"+1234567890\", \"message\": \"Hi, I'm calling about your appointment.\"}\n\
                - Custom assistant: {\"action\": \"create_call\", \"phone_number\": \"+1234567890\", \"assistant_config\": {\"firstMessage\": \"Hello!\", \"voice\": \"emma\"}}\n\
                - Status: {\"action\": \"get_call\", \"call_id\": \"call_xxx\"}\n\
                - Recent calls: {\"action\": \"list_calls\", \"limit\": 10}",
            "parameters": {
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["create_call", "get_call", "end_call", "list_calls", "create_assistant"],
                        "description": "Create a call, get call info, end a call, list calls, or create an assistant"
                    },
                    "phone_number": {
                        "type": "string",
                        "description": "The phone number to call (required for create_call). Format: +1234567890"
                    },
                    "call_id": {
                        "type": "string",
                        "description": "The ID of an existing call (required for get_call and end_call)"
                    },
                    "message": {
                        "type": "string",
                        "description": "Simple opening message for the assistant to speak (alternative to assistant_config)"
                    },
                    "assistant_config": {
                        "type": "object",
                        "description": "Advanced assistant configuration",
                        "properties": {
                            "name": {"type": "string", "description": "Assistant name"},
                            "firstMessage": {"type": "string", "description": "First message the assistant speaks"},
                            "systemPrompt": {"type": "string", "description": "System prompt for the assistant"},
                            "model": {"type": "string", "description": "LLM model to use (e.g. 'gpt-4', 'gpt-3.5-turbo')"},
                            "voice": {"type": "string", "description": "Azure voice (e.g. 'andrew', 'brian', 'emma', 'olivia')"},
                            "temperature": {"type": "number", "description": "LLM temperature (0-2)"},
                            "maxDurationSeconds": {"type": "integer", "description": "Maximum call duration in seconds"},
                            "endCallPhrases": {
                                "type": "array",
                                "items": {"type": "string"},
                                "description": "Phrases that end the call"
                            }
                        }
                    },
                    "assistant_id": {
                        "type": "string",
                        "description": "ID of an existing assistant to use for the call"
                    },
                    "metadata": {
                        "type": "object",
                        "description": "Custom metadata to attach to the call"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of calls to return (for list_calls)",
                        "default": 10
                    }
                },
                "required": ["action"]
            }
        }),
        serde_json::json!({
            "name": PYTHON_TOOL,
            "description": "Executes Python code. Only print() output is visible; return values are not captured. Use print statements to see results.",
            "parameters": {
                "type": "object",
                "properties": {
                    "code": {
                        "type": "string",
                        "description": "The Python code to execute"
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "Optional timeout in seconds (max 300)"
                    }
                },
                "required": ["code"]
            }
        }),
        serde_json::json!({
            "name": DATETIME_TOOL,
            "description": "Get the current date and time, including an ISO 8601 timestamp.",
            "parameters": {
                "type": "object",
                "properties": {},
                "required": []
            }
        }),
        serde_json::json!({
            "name": TERMINATE_TOOL,
            "description": "Terminate the interaction when the request is met OR if the assistant cannot proceed further with the task.",
            "parameters": {
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["success", "failure"],
                        "description": "The finish status of the interaction"
                    }
                },
                "required": ["status"]
            }
        }),
    ]
}
