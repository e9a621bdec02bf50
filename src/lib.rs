pub mod agent;
pub mod apis;
pub mod config;
pub mod errors;
pub mod logging;
pub mod prompts;
pub mod tools;

// Re-export the agent and its configuration for the binary
pub use agent::core::{Agent, AgentState};
pub use config::Config;
