use crate::agent::executor::AgentExecutor;
use crate::agent::tools::ToolCollection;
use crate::apis::api_client::{DynApiClient, Message};
use crate::apis::openai::OpenAIClient;
use crate::config::Config;
use crate::errors::AppError;
use crate::prompts;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Idle,
    Running,
    Finished,
    Error,
}

/// Holds the agent in `Running` for the length of a run. A run future dropped
/// mid-flight (Ctrl-C) leaves the agent in `Error` rather than `Running`.
struct RunGuard<'a> {
    state: &'a mut AgentState,
}

impl<'a> RunGuard<'a> {
    fn start(state: &'a mut AgentState) -> Self {
        *state = AgentState::Running;
        Self { state }
    }

    fn finish(self, outcome: AgentState) {
        *self.state = outcome;
        info!("Run ended in state {:?}", outcome);
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if *self.state == AgentState::Running {
            warn!("Agent run interrupted before completion");
            *self.state = AgentState::Error;
        }
    }
}

pub struct Agent {
    config: Config,
    api_client: DynApiClient,
    tools: Arc<ToolCollection>,
    system_prompt: String,
    progress_sender: Option<mpsc::Sender<String>>,
    // Store the conversation history
    conversation_history: Vec<Message>,
    state: AgentState,
    cleaned_up: bool,
}

impl Agent {
    /// Build an agent backed by the OpenAI client described in `config`.
    pub fn new(config: Config) -> Result<Self> {
        let api_key = config.openai_api_key.clone().ok_or_else(|| {
            AppError::ConfigError("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        let client = OpenAIClient::with_api_key(api_key, Some(config.openai_model.clone()))?
            .with_api_base(config.openai_base_url.clone());
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Build an agent around an already-constructed LLM client.
    pub fn with_client(config: Config, api_client: DynApiClient) -> Self {
        let tools = Arc::new(ToolCollection::from_config(&config));
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let system_prompt = prompts::system_prompt(&config.workspace_root, &now);

        Self {
            config,
            api_client,
            tools,
            system_prompt,
            progress_sender: None,
            conversation_history: Vec::new(),
            state: AgentState::Idle,
            cleaned_up: false,
        }
    }

    pub fn with_system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn with_progress_sender(mut self, sender: mpsc::Sender<String>) -> Self {
        self.progress_sender = Some(sender);
        self
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn conversation_history(&self) -> &[Message] {
        &self.conversation_history
    }

    pub fn clear_history(&mut self) {
        self.conversation_history.clear();
    }

    /// Work on `prompt` until the model finishes or the step budget runs out.
    ///
    /// Returns the per-step log. History carries over between runs, and
    /// [`Agent::state`] reports how the latest run ended.
    pub async fn run(&mut self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(AppError::ValidationError("Empty prompt provided".to_string()).into());
        }
        if self.state == AgentState::Running {
            return Err(AppError::Other(format!(
                "Cannot run agent from state: {:?}",
                self.state
            ))
            .into());
        }

        info!("Processing request: {}", prompt);

        let mut executor = AgentExecutor::new(self.api_client.clone(), self.tools.clone())
            .with_limits(self.config.max_steps, self.config.max_observe)
            .with_system_prompt(self.system_prompt.clone())
            .with_next_step_prompt(prompts::NEXT_STEP_PROMPT.to_string());
        if let Some(sender) = &self.progress_sender {
            executor = executor.with_progress_sender(sender.clone());
        }
        executor.set_conversation_history(self.conversation_history.clone());
        executor.add_user_message(prompt.to_string());

        let guard = RunGuard::start(&mut self.state);
        let result = executor.execute().await;

        // Keep whatever the executor managed to record, even on failure
        self.conversation_history = executor.get_conversation_history();
        guard.finish(match &result {
            Ok(_) => AgentState::Finished,
            Err(e) => {
                warn!("Agent run failed: {}", e);
                AgentState::Error
            }
        });

        result
    }

    /// Release tool resources. Safe to call more than once.
    pub async fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.tools.cleanup().await;
        self.cleaned_up = true;
        info!("Agent resources cleaned up");
    }
}
