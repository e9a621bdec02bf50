use crate::agent::tools::{parse_tool_call, ToolCollection};
use crate::apis::api_client::{CompletionOptions, DynApiClient, Message, ToolCall, ToolDefinition};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub const DEFAULT_MAX_STEPS: usize = 50;
pub const DEFAULT_MAX_OBSERVE: usize = 10_000;
const DUPLICATE_THRESHOLD: usize = 2;

pub const STUCK_PROMPT: &str = "Observed duplicate responses. Consider new strategies and avoid \
repeating ineffective paths already attempted.";

struct StepOutcome {
    summary: String,
    finished: bool,
}

pub struct AgentExecutor {
    api_client: DynApiClient,
    tools: Arc<ToolCollection>,
    tool_definitions: Vec<ToolDefinition>,
    conversation: Vec<Message>,
    system_prompt: Option<String>,
    next_step_prompt: Option<String>,
    max_steps: usize,
    max_observe: usize,
    progress_sender: Option<mpsc::Sender<String>>,
}

impl AgentExecutor {
    pub fn new(api_client: DynApiClient, tools: Arc<ToolCollection>) -> Self {
        let tool_definitions = tools.definitions();
        Self {
            api_client,
            tools,
            tool_definitions,
            conversation: Vec::new(),
            system_prompt: None,
            next_step_prompt: None,
            max_steps: DEFAULT_MAX_STEPS,
            max_observe: DEFAULT_MAX_OBSERVE,
            progress_sender: None,
        }
    }

    pub fn with_progress_sender(mut self, sender: mpsc::Sender<String>) -> Self {
        self.progress_sender = Some(sender);
        self
    }

    pub fn with_limits(mut self, max_steps: usize, max_observe: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self.max_observe = max_observe;
        self
    }

    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = Some(prompt);
        self
    }

    pub fn with_next_step_prompt(mut self, prompt: String) -> Self {
        self.next_step_prompt = Some(prompt);
        self
    }

    pub fn set_conversation_history(&mut self, history: Vec<Message>) {
        self.conversation = history;
    }

    pub fn get_conversation_history(&self) -> Vec<Message> {
        self.conversation.clone()
    }

    pub fn add_user_message(&mut self, content: String) {
        self.conversation.push(Message::user(content));
    }

    pub fn next_step_prompt(&self) -> Option<&str> {
        self.next_step_prompt.as_deref()
    }

    async fn report(&self, message: String) {
        if let Some(sender) = &self.progress_sender {
            let _ = sender.send(message).await;
        }
    }

    /// Run think/act steps until a special tool fires, the model stops calling
    /// tools, or the step budget runs out.
    pub async fn execute(&mut self) -> Result<String> {
        let mut results = Vec::new();
        let mut finished = false;

        for step in 1..=self.max_steps {
            info!("Executing step {}/{}", step, self.max_steps);
            self.report(format!("⏺ Step {}/{}", step, self.max_steps)).await;

            let outcome = self.step().await?;
            results.push(format!("Step {}: {}", step, outcome.summary));

            if outcome.finished {
                finished = true;
                break;
            }

            if self.is_stuck() {
                self.handle_stuck_state();
            }
        }

        if !finished {
            warn!("Reached max steps ({})", self.max_steps);
            results.push(format!("Terminated: Reached max steps ({})", self.max_steps));
        }

        Ok(results.join("\n"))
    }

    fn request_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.conversation.len() + 2);
        if let Some(system) = &self.system_prompt {
            messages.push(Message::system(system.clone()));
        }
        messages.extend(self.conversation.iter().cloned());
        if let Some(next) = &self.next_step_prompt {
            messages.push(Message::user(next.clone()));
        }
        messages
    }

    async fn step(&mut self) -> Result<StepOutcome> {
        let options = CompletionOptions {
            tools: Some(self.tool_definitions.clone()),
            ..Default::default()
        };

        let (content, tool_calls) = self
            .api_client
            .complete_with_tools(self.request_messages(), options)
            .await?;

        if !content.is_empty() {
            info!("Deptheon's thoughts: {}", content);
        }

        let Some(calls) = tool_calls.filter(|calls| !calls.is_empty()) else {
            self.conversation.push(Message::assistant(content.clone()));
            let summary = if content.is_empty() {
                "Thinking complete - no action needed".to_string()
            } else {
                content
            };
            return Ok(StepOutcome {
                summary,
                finished: true,
            });
        };

        // Every call needs an id so its result can be paired with it
        let calls: Vec<ToolCall> = calls
            .into_iter()
            .map(|mut call| {
                if call.id.as_deref().map_or(true, str::is_empty) {
                    call.id = Some(format!("call_{}", uuid::Uuid::new_v4().simple()));
                }
                call
            })
            .collect();

        info!(
            "Deptheon selected {} tool{}: {:?}",
            calls.len(),
            if calls.len() == 1 { "" } else { "s" },
            calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
        );
        self.conversation
            .push(Message::assistant_with_tools(content, calls.clone()));

        let mut observations = Vec::with_capacity(calls.len());
        let mut finished = false;

        // Every call is answered, even after a special tool fires
        for call in &calls {
            self.report(format!("\x1b[32m⏺\x1b[0m {} {}", call.name, call.arguments))
                .await;

            let observation = match parse_tool_call(&call.name, &call.arguments) {
                Ok(tool_call) => {
                    let output = self.tools.execute(&tool_call).await;
                    if tool_call.is_special() {
                        info!("Special tool '{}' has completed the task", call.name);
                        finished = true;
                    }
                    render_observation(&call.name, &output.to_string())
                }
                Err(e) => {
                    warn!("Failed to parse tool call {}: {:#}", call.name, e);
                    format!("Error: {:#}", e)
                }
            };
            let observation = truncate_chars(&observation, self.max_observe);

            self.conversation.push(Message::tool(
                call.id.clone().unwrap_or_default(),
                observation.clone(),
            ));
            observations.push(observation);
        }

        Ok(StepOutcome {
            summary: observations.join("\n\n"),
            finished,
        })
    }

    /// True when the latest assistant text already appeared at least
    /// `DUPLICATE_THRESHOLD` times earlier in the conversation.
    pub fn is_stuck(&self) -> bool {
        let Some(last) = self.conversation.iter().rev().find(|m| m.role == "assistant") else {
            return false;
        };
        if last.content.is_empty() {
            return false;
        }

        let duplicates = self
            .conversation
            .iter()
            .filter(|m| m.role == "assistant" && m.content == last.content)
            .count()
            .saturating_sub(1);

        duplicates >= DUPLICATE_THRESHOLD
    }

    fn handle_stuck_state(&mut self) {
        warn!("Agent detected stuck state. Added prompt: {}", STUCK_PROMPT);
        let current = self.next_step_prompt.take().unwrap_or_default();
        self.next_step_prompt = Some(if current.starts_with(STUCK_PROMPT) {
            current
        } else {
            format!("{}\n{}", STUCK_PROMPT, current)
        });
    }
}

pub fn render_observation(name: &str, result: &str) -> String {
    if result.is_empty() {
        format!("Cmd `{}` completed with no output", name)
    } else {
        format!("Observed output of cmd `{}` executed:\n{}", name, result)
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
