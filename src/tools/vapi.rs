//! Vapi voice-calling tool: outbound calls, call lookup, reusable assistants.

use crate::config::VapiConfig;
use crate::tools::vapi_client::{VapiCall, VapiClient};
use crate::tools::ToolOutput;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

pub const NOT_CONFIGURED: &str =
    "Vapi not configured. Please set VAPI_API_KEY environment variable.";
pub const NO_PHONE_NUMBER: &str =
    "No phone number configured. Please set VAPI_PHONE_NUMBER_ID or use an assistant_id";

const DEFAULT_LIST_LIMIT: u32 = 10;
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_VOICE: &str = "andrew";
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const SIMPLE_CALL_PROMPT: &str =
    "You are a helpful assistant making a phone call. Be concise and friendly.";

lazy_static! {
    static ref PHONE_FORMATTING: Regex = Regex::new(r"[\s\-\.\(\)]").unwrap();
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub name: Option<String>,
    #[serde(rename = "firstMessage")]
    pub first_message: Option<String>,
    #[serde(rename = "systemPrompt")]
    pub system_prompt: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub temperature: Option<f64>,
    #[serde(rename = "maxDurationSeconds")]
    pub max_duration_seconds: Option<u64>,
    #[serde(rename = "endCallPhrases")]
    pub end_call_phrases: Option<Vec<String>>,
}

impl AssistantConfig {
    fn is_empty(&self) -> bool {
        *self == AssistantConfig::default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VapiParams {
    pub action: String,
    pub phone_number: Option<String>,
    pub call_id: Option<String>,
    pub message: Option<String>,
    pub assistant_config: Option<AssistantConfig>,
    pub assistant_id: Option<String>,
    pub metadata: Option<Value>,
    pub limit: Option<u32>,
}

pub struct VapiTool {
    client: Option<VapiClient>,
    configured_phone_number_id: Option<String>,
    phone_number_id: OnceCell<Option<String>>,
}

impl VapiTool {
    pub fn new(config: &VapiConfig) -> Self {
        let client = match config.api_key.as_deref() {
            None => {
                warn!("VAPI_API_KEY not found in environment. Vapi tool will not be functional.");
                None
            }
            Some(key) => match VapiClient::new(key, &config.base_url) {
                Ok(client) => {
                    info!("Vapi client initialized successfully");
                    Some(client)
                }
                Err(e) => {
                    error!("Failed to initialize Vapi: {}", e);
                    None
                }
            },
        };

        Self {
            client,
            configured_phone_number_id: config.phone_number_id.clone(),
            phone_number_id: OnceCell::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub async fn execute(&self, params: &VapiParams) -> ToolOutput {
        let Some(client) = &self.client else {
            return ToolOutput::failure(NOT_CONFIGURED);
        };

        match params.action.as_str() {
            "create_call" => self.create_call(client, params).await,
            "get_call" => get_call(client, params).await,
            "end_call" => end_call(params),
            "list_calls" => list_calls(client, params).await,
            "create_assistant" => create_assistant(client, params).await,
            other => ToolOutput::failure(format!("Unknown action: {}", other)),
        }
    }

    /// The phone number calls are placed from: configured id, else the account's first number.
    async fn outbound_number(&self, client: &VapiClient) -> Option<String> {
        self.phone_number_id
            .get_or_init(|| async {
                if let Some(id) = &self.configured_phone_number_id {
                    return Some(id.clone());
                }
                match client.list_phone_numbers().await {
                    Ok(numbers) => match numbers.into_iter().next() {
                        Some(first) => {
                            info!(
                                "Using phone number ID: {} (Number: {})",
                                first.id,
                                first.number.as_deref().unwrap_or("unknown")
                            );
                            Some(first.id)
                        }
                        None => {
                            warn!(
                                "No phone numbers found. Add one in the Vapi dashboard or provide assistant_id."
                            );
                            None
                        }
                    },
                    Err(e) => {
                        warn!("Could not list phone numbers: {}", e);
                        None
                    }
                }
            })
            .await
            .clone()
    }

    async fn create_call(&self, client: &VapiClient, params: &VapiParams) -> ToolOutput {
        let Some(raw_number) = params.phone_number.as_deref().filter(|n| !n.trim().is_empty())
        else {
            return ToolOutput::failure("phone_number is required for create_call");
        };
        let phone_number = normalize_phone_number(raw_number);

        let mut body = build_call_body(&phone_number, params);
        let assistant_id = params.assistant_id.as_deref().filter(|id| !id.is_empty());

        match self.outbound_number(client).await {
            Some(id) => {
                body["phoneNumberId"] = Value::String(id);
            }
            None if assistant_id.is_none() => return ToolOutput::failure(NO_PHONE_NUMBER),
            None => {}
        }

        info!("Creating call with config: {}", body);
        let call = match client.create_call(&body).await {
            Ok(call) => call,
            Err(e) => return ToolOutput::failure(format!("Failed to create call: {}", e)),
        };

        let mut output = format!(
            "Successfully created call!\nCall ID: {}\nStatus: {}\nTo: {}\n",
            call.id,
            call.status_label(),
            phone_number
        );
        if let Some(created) = &call.created_at {
            output.push_str(&format!("Created: {}\n", created));
        }

        ToolOutput::success(output).with_metadata(json!({
            "call_id": call.id,
            "status": call.status_label(),
            "phone_number": phone_number,
        }))
    }
}

async fn get_call(client: &VapiClient, params: &VapiParams) -> ToolOutput {
    let Some(call_id) = params.call_id.as_deref().filter(|id| !id.is_empty()) else {
        return ToolOutput::failure("call_id is required for get_call");
    };

    match client.get_call(call_id).await {
        Ok(call) => ToolOutput::success(format_call_details(&call)),
        Err(e) => ToolOutput::failure(format!("Failed to get call: {}", e)),
    }
}

fn end_call(params: &VapiParams) -> ToolOutput {
    let Some(call_id) = params.call_id.as_deref().filter(|id| !id.is_empty()) else {
        return ToolOutput::failure("call_id is required for end_call");
    };

    ToolOutput::success(format!(
        "To end call {}, you can:\n\
         1. Use end call phrases configured in the assistant\n\
         2. Use the call's live control URL to send an end-call command\n\
         3. Let the call time out based on maxDurationSeconds\n\
         4. The called party can hang up\n",
        call_id
    ))
    .with_error("Direct call ending not available through this API. See output for alternatives.")
}

async fn list_calls(client: &VapiClient, params: &VapiParams) -> ToolOutput {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    let calls = match client.list_calls(limit).await {
        Ok(calls) => calls,
        Err(e) => return ToolOutput::failure(format!("Failed to list calls: {}", e)),
    };
    if calls.is_empty() {
        return ToolOutput::success("No calls found.");
    }

    let mut output = format!(
        "Recent Calls (showing {} of {} requested):\n\n",
        calls.len(),
        limit
    );
    for (i, call) in calls.iter().enumerate() {
        output.push_str(&format!("{}. Call {}\n", i + 1, call.id));
        output.push_str(&format!("   Status: {}\n", call.status_label()));
        output.push_str(&format!("   Type: {}\n", call.type_label()));
        if let Some(created) = &call.created_at {
            output.push_str(&format!("   Created: {}\n", created));
        }
        if let Some(cost) = call.cost {
            output.push_str(&format!("   Cost: ${:.2}\n", cost));
        }
        if let Some(reason) = &call.ended_reason {
            output.push_str(&format!("   End Reason: {}\n", reason));
        }
        output.push('\n');
    }

    ToolOutput::success(output)
}

async fn create_assistant(client: &VapiClient, params: &VapiParams) -> ToolOutput {
    let config = params.assistant_config.clone().unwrap_or_default();
    let body = build_assistant_body(&config, true);

    match client.create_assistant(&body).await {
        Ok(assistant) => {
            let name = assistant
                .name
                .clone()
                .unwrap_or_else(|| body["name"].as_str().unwrap_or_default().to_string());
            let output = format!(
                "Successfully created assistant!\nAssistant ID: {}\nName: {}\nModel: {}\nVoice: {}\n\nUse this assistant_id when creating calls.",
                assistant.id,
                name,
                body["model"]["model"].as_str().unwrap_or(DEFAULT_MODEL),
                body["voice"]["voiceId"].as_str().unwrap_or(DEFAULT_VOICE),
            );
            ToolOutput::success(output).with_metadata(json!({
                "assistant_id": assistant.id,
                "name": name,
            }))
        }
        Err(e) => ToolOutput::failure(format!("Failed to create assistant: {}", e)),
    }
}

fn format_call_details(call: &VapiCall) -> String {
    let mut output = format!(
        "Call Information:\nID: {}\nStatus: {}\nType: {}\n",
        call.id,
        call.status_label(),
        call.type_label()
    );
    if let Some(started) = &call.started_at {
        output.push_str(&format!("Started: {}\n", started));
    }
    if let Some(ended) = &call.ended_at {
        output.push_str(&format!("Ended: {}\n", ended));
    }
    if let Some(cost) = call.cost {
        output.push_str(&format!("Cost: ${:.2}\n", cost));
    }
    if let Some(reason) = &call.ended_reason {
        output.push_str(&format!("End Reason: {}\n", reason));
    }
    if let Some(url) = call.recording() {
        output.push_str(&format!("Recording: {}\n", url));
    }
    if let Some(transcript) = call.transcript_text() {
        output.push_str(&format!("\nTranscript:\n{}\n", transcript));
    }
    output
}

/// Strip punctuation and default to a US country code when none is given.
pub fn normalize_phone_number(raw: &str) -> String {
    let digits = PHONE_FORMATTING.replace_all(raw.trim(), "");
    if digits.starts_with('+') {
        digits.into_owned()
    } else {
        format!("+1{}", digits)
    }
}

/// Request body for `POST /call`, minus the phone number id.
pub fn build_call_body(phone_number: &str, params: &VapiParams) -> Value {
    let mut body = json!({ "customer": { "number": phone_number } });

    if let Some(metadata) = params.metadata.as_ref().filter(|m| !m.is_null()) {
        body["metadata"] = metadata.clone();
    }

    if let Some(id) = params.assistant_id.as_deref().filter(|id| !id.is_empty()) {
        body["assistantId"] = Value::String(id.to_string());
        return body;
    }

    let config = params.assistant_config.clone().unwrap_or_default();
    body["assistant"] = match params.message.as_deref().filter(|m| !m.is_empty()) {
        Some(message) if config.is_empty() => json!({
            "firstMessage": message,
            "model": {
                "provider": "openai",
                "model": DEFAULT_MODEL,
                "messages": [{ "role": "system", "content": SIMPLE_CALL_PROMPT }],
            },
            "voice": { "provider": "azure", "voiceId": DEFAULT_VOICE },
        }),
        _ => build_assistant_body(&config, false),
    };
    body
}

/// Assistant definition shared by inline calls and `POST /assistant`.
pub fn build_assistant_body(config: &AssistantConfig, standalone: bool) -> Value {
    let default_greeting = if standalone {
        "Hello, how can I help you?"
    } else {
        "Hello, how can I help you today?"
    };

    let mut model = json!({
        "provider": "openai",
        "model": config.model.as_deref().unwrap_or(DEFAULT_MODEL),
        "messages": [{
            "role": "system",
            "content": config.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT),
        }],
    });
    if let Some(temperature) = config.temperature {
        model["temperature"] = json!(temperature);
    }

    let mut assistant = Map::new();
    if standalone {
        assistant.insert(
            "name".to_string(),
            json!(config.name.as_deref().unwrap_or("Voice Assistant")),
        );
    }
    assistant.insert(
        "firstMessage".to_string(),
        json!(config.first_message.as_deref().unwrap_or(default_greeting)),
    );
    assistant.insert("model".to_string(), model);
    assistant.insert(
        "voice".to_string(),
        json!({
            "provider": "azure",
            "voiceId": config.voice.as_deref().unwrap_or(DEFAULT_VOICE),
        }),
    );
    if let Some(seconds) = config.max_duration_seconds {
        assistant.insert("maxDurationSeconds".to_string(), json!(seconds));
    }
    if let Some(phrases) = &config.end_call_phrases {
        assistant.insert("endCallPhrases".to_string(), json!(phrases));
    }

    Value::Object(assistant)
}
