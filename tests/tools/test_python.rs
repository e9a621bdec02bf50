//! Tests for the sandboxed code runner

use deptheon::tools::python::{PythonParams, PythonTool};
use std::process::Command;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn python_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn code(source: &str) -> PythonParams {
    PythonParams {
        code: source.to_string(),
        timeout: None,
    }
}

#[tokio::test]
async fn test_print_output_is_captured() {
    if !python_available() {
        return;
    }
    let dir = tempdir().unwrap();
    let tool = PythonTool::new("python3", dir.path(), 5);

    let output = tool.execute(&code("print(2 + 2)")).await;
    assert!(!output.is_error());
    assert_eq!(output.output.as_deref(), Some("4\n"));

    // Only printed values are visible
    let output = tool.execute(&code("x = 5")).await;
    assert_eq!(output.output.as_deref(), Some(""));
}

#[tokio::test]
async fn test_exception_is_reported() {
    if !python_available() {
        return;
    }
    let dir = tempdir().unwrap();
    let tool = PythonTool::new("python3", dir.path(), 5);

    let output = tool
        .execute(&code("print('before')\nraise ValueError('bad input')"))
        .await;
    assert!(output.is_error());
    assert!(output.error.unwrap().contains("ValueError: bad input"));
    assert_eq!(output.output.as_deref(), Some("before\n"));
    assert_eq!(output.metadata.unwrap()["exit_code"], 1);
}

#[tokio::test]
async fn test_runs_in_workspace_directory() {
    if !python_available() {
        return;
    }
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("data.txt"), "hello from disk").unwrap();
    let tool = PythonTool::new("python3", dir.path(), 5);

    let output = tool
        .execute(&code("print(open('data.txt').read())"))
        .await;
    assert_eq!(output.output.as_deref(), Some("hello from disk\n"));
}

#[tokio::test]
async fn test_timeout_kills_the_process() {
    let dir = tempdir().unwrap();
    let tool = PythonTool::new("sh", dir.path(), 5);

    let started = Instant::now();
    let output = tool
        .execute(&PythonParams {
            code: "sleep 30".to_string(),
            timeout: Some(1),
        })
        .await;
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(
        output.error.as_deref(),
        Some("Execution timeout after 1 seconds")
    );
}

#[tokio::test]
async fn test_timeout_is_clamped() {
    let dir = tempdir().unwrap();
    let tool = PythonTool::new("sh", dir.path(), 5);

    // Zero is raised to the one-second floor
    let output = tool
        .execute(&PythonParams {
            code: "sleep 30".to_string(),
            timeout: Some(0),
        })
        .await;
    assert_eq!(
        output.error.as_deref(),
        Some("Execution timeout after 1 seconds")
    );
}

#[tokio::test]
async fn test_nonzero_exit_carries_stderr_and_code() {
    let dir = tempdir().unwrap();
    let tool = PythonTool::new("sh", dir.path(), 5);

    let output = tool
        .execute(&code("echo partial; echo failure >&2; exit 3"))
        .await;
    assert_eq!(output.error.as_deref(), Some("failure"));
    assert_eq!(output.output.as_deref(), Some("partial\n"));
    assert_eq!(output.metadata.unwrap()["exit_code"], 3);
}

#[tokio::test]
async fn test_empty_code_is_rejected() {
    let dir = tempdir().unwrap();
    let tool = PythonTool::new("python3", dir.path(), 5);
    let output = tool.execute(&code("   ")).await;
    assert_eq!(
        output.error.as_deref(),
        Some("code is required for python_execute")
    );
}

#[tokio::test]
async fn test_missing_interpreter_is_reported() {
    let dir = tempdir().unwrap();
    let tool = PythonTool::new("deptheon-no-such-interpreter", dir.path(), 5);
    let output = tool.execute(&code("print(1)")).await;
    assert!(output
        .error
        .unwrap()
        .starts_with("Failed to start deptheon-no-such-interpreter:"));
}
