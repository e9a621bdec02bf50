//! Python execution in a child interpreter with a hard timeout.

use crate::tools::ToolOutput;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const MAX_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PythonParams {
    pub code: String,
    pub timeout: Option<u64>,
}

pub struct PythonTool {
    interpreter: String,
    workdir: PathBuf,
    default_timeout_secs: u64,
}

impl PythonTool {
    pub fn new(interpreter: impl Into<String>, workdir: impl Into<PathBuf>, default_timeout_secs: u64) -> Self {
        Self {
            interpreter: interpreter.into(),
            workdir: workdir.into(),
            default_timeout_secs,
        }
    }

    pub async fn execute(&self, params: &PythonParams) -> ToolOutput {
        if params.code.trim().is_empty() {
            return ToolOutput::failure("code is required for python_execute");
        }

        let timeout_secs = params
            .timeout
            .unwrap_or(self.default_timeout_secs)
            .clamp(1, MAX_TIMEOUT_SECS);

        let mut command = Command::new(&self.interpreter);
        command
            .arg("-c")
            .arg(&params.code)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if self.workdir.is_dir() {
            command.current_dir(&self.workdir);
        }

        debug!(timeout_secs, "running python snippet");
        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ToolOutput::failure(format!(
                    "Failed to start {}: {}",
                    self.interpreter, e
                ))
            }
        };

        // Dropping the future on timeout drops the child, which kills it
        match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
            Err(_) => {
                warn!("python snippet exceeded {}s", timeout_secs);
                ToolOutput::failure(format!("Execution timeout after {} seconds", timeout_secs))
            }
            Ok(Err(e)) => ToolOutput::failure(format!("Execution failed: {}", e)),
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                if output.status.success() {
                    ToolOutput::success(stdout)
                } else {
                    let mut result = ToolOutput::failure(stderr.trim_end().to_string());
                    if !stdout.is_empty() {
                        result.output = Some(stdout);
                    }
                    result.with_metadata(serde_json::json!({
                        "exit_code": output.status.code().unwrap_or(-1),
                    }))
                }
            }
        }
    }
}
