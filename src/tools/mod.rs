//! Capability wrappers the agent can call.
//!
//! Each wrapper answers with a [`ToolOutput`]; failures are data, not `Err`,
//! so the reasoning loop can show them to the model and carry on.

pub mod composio;
pub mod composio_client;
pub mod connections;
pub mod datetime;
pub mod python;
pub mod vapi;
pub mod vapi_client;

use serde::Serialize;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolOutput {
    pub output: Option<String>,
    pub error: Option<String>,
    pub metadata: Option<Value>,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Display for ToolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.output, &self.error) {
            (Some(output), Some(error)) => write!(f, "{}\nError: {}", output, error),
            (None, Some(error)) => write!(f, "Error: {}", error),
            (Some(output), None) => write!(f, "{}", output),
            (None, None) => Ok(()),
        }
    }
}
