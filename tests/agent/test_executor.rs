//! Tests for the reasoning loop, driven by a scripted LLM

use crate::common::{call, test_config, ScriptedClient};
use deptheon::agent::executor::{AgentExecutor, STUCK_PROMPT};
use deptheon::agent::tools::ToolCollection;
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::sync::mpsc;

fn executor_with(client: &ScriptedClient, max_steps: usize, max_observe: usize) -> AgentExecutor {
    let dir = tempdir().expect("Failed to create temp dir");
    let tools = Arc::new(ToolCollection::from_config(&test_config(dir.path(), &[])));
    AgentExecutor::new(Arc::new(client.clone()), tools)
        .with_limits(max_steps, max_observe)
        .with_system_prompt("system".to_string())
        .with_next_step_prompt("next step".to_string())
}

#[test]
fn test_conversation_history_management() {
    let client = ScriptedClient::new(vec![]);
    let mut executor = executor_with(&client, 5, 100);
    assert!(executor.get_conversation_history().is_empty());

    executor.add_user_message("Test query".to_string());
    let history = executor.get_conversation_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, "user");
    assert_eq!(history[0].content, "Test query");
}

#[tokio::test]
async fn test_reply_without_tools_finishes() {
    let client = ScriptedClient::new(vec![("All done.".to_string(), None)]);
    let mut executor = executor_with(&client, 5, 1000);
    executor.add_user_message("hello".to_string());

    let result = executor.execute().await.unwrap();
    assert_eq!(result, "Step 1: All done.");

    let history = executor.get_conversation_history();
    assert_eq!(history.last().unwrap().role, "assistant");
    assert_eq!(history.last().unwrap().content, "All done.");

    // System prompt and next-step prompt frame every request but are not stored
    let sent = &client.requests()[0];
    assert_eq!(sent.first().unwrap().role, "system");
    assert_eq!(sent.last().unwrap().content, "next step");
    assert!(history.iter().all(|m| m.role != "system"));
}

#[tokio::test]
async fn test_terminate_stops_the_loop() {
    let client = ScriptedClient::new(vec![
        (
            "Checking the clock".to_string(),
            Some(vec![call("call_1", "get_datetime", json!({}))]),
        ),
        (
            String::new(),
            Some(vec![call("call_2", "terminate", json!({"status": "success"}))]),
        ),
        ("never reached".to_string(), None),
    ]);
    let mut executor = executor_with(&client, 10, 10_000);
    executor.add_user_message("what time is it?".to_string());

    let result = executor.execute().await.unwrap();
    let lines: Vec<&str> = result.lines().collect();
    assert!(lines[0].starts_with("Step 1: Observed output of cmd `get_datetime` executed:"));
    assert!(result.contains("Step 2: Observed output of cmd `terminate` executed:"));
    assert!(result.contains("completed with status: success"));
    assert!(!result.contains("Terminated: Reached max steps"));
    assert_eq!(client.requests().len(), 2);

    // Each tool result is paired with the id of the call that produced it
    let history = executor.get_conversation_history();
    let tool_msgs: Vec<_> = history.iter().filter(|m| m.role == "tool").collect();
    assert_eq!(tool_msgs.len(), 2);
    assert_eq!(tool_msgs[0].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(tool_msgs[1].tool_call_id.as_deref(), Some("call_2"));
    assert!(history
        .iter()
        .any(|m| m.role == "assistant" && m.tool_calls.is_some()));
}

#[tokio::test]
async fn test_calls_after_terminate_still_run() {
    let client = ScriptedClient::new(vec![
        (
            String::new(),
            Some(vec![
                call("call_1", "terminate", json!({"status": "success"})),
                call("call_2", "get_datetime", json!({})),
                call("call_3", "rm_rf", json!({})),
            ]),
        ),
        ("never reached".to_string(), None),
    ]);
    let mut executor = executor_with(&client, 10, 10_000);
    executor.add_user_message("wrap up".to_string());

    let result = executor.execute().await.unwrap();
    assert!(result.starts_with("Step 1: Observed output of cmd `terminate` executed:"));
    assert!(result.contains("Observed output of cmd `get_datetime` executed:"));
    assert!(result.contains("Error: Unknown tool: rm_rf"));
    assert!(!result.contains("Step 2:"));
    assert_eq!(client.requests().len(), 1);

    let history = executor.get_conversation_history();
    let answered: Vec<_> = history
        .iter()
        .filter(|m| m.role == "tool")
        .filter_map(|m| m.tool_call_id.as_deref())
        .collect();
    assert_eq!(answered, vec!["call_1", "call_2", "call_3"]);
}

#[tokio::test]
async fn test_max_steps_reached() {
    let client = ScriptedClient::repeating((
        String::new(),
        Some(vec![call("call_x", "get_datetime", json!({}))]),
    ));
    let mut executor = executor_with(&client, 3, 10_000);
    executor.add_user_message("loop forever".to_string());

    let result = executor.execute().await.unwrap();
    assert!(result.contains("Step 3:"));
    assert!(!result.contains("Step 4:"));
    assert!(result.ends_with("Terminated: Reached max steps (3)"));
}

#[tokio::test]
async fn test_observations_are_truncated() {
    let client = ScriptedClient::new(vec![
        (
            String::new(),
            Some(vec![call("call_1", "get_datetime", json!({}))]),
        ),
        ("done".to_string(), None),
    ]);
    let mut executor = executor_with(&client, 5, 20);
    executor.add_user_message("time".to_string());
    executor.execute().await.unwrap();

    let history = executor.get_conversation_history();
    let observation = history.iter().find(|m| m.role == "tool").unwrap();
    assert_eq!(observation.content.chars().count(), 20);
    assert!("Observed output of cmd".starts_with(&observation.content));
}

#[tokio::test]
async fn test_unknown_tool_becomes_error_observation() {
    let client = ScriptedClient::new(vec![
        (
            String::new(),
            Some(vec![call("call_1", "rm_rf", json!({"path": "/"}))]),
        ),
        ("giving up".to_string(), None),
    ]);
    let mut executor = executor_with(&client, 5, 10_000);
    executor.add_user_message("do something odd".to_string());

    let result = executor.execute().await.unwrap();
    assert!(result.contains("Step 1: Error: Unknown tool: rm_rf"));
    assert!(result.contains("Step 2: giving up"));
}

#[tokio::test]
async fn test_missing_required_argument_is_reported() {
    let client = ScriptedClient::new(vec![
        (
            String::new(),
            Some(vec![call("call_1", "composio_tool", json!({}))]),
        ),
        ("ok".to_string(), None),
    ]);
    let mut executor = executor_with(&client, 5, 10_000);
    executor.add_user_message("list tools".to_string());

    let result = executor.execute().await.unwrap();
    assert!(result.contains("Failed to parse composio_tool parameters"));
}

#[tokio::test]
async fn test_unconfigured_vendor_error_reaches_the_model() {
    let client = ScriptedClient::new(vec![
        (
            String::new(),
            Some(vec![call(
                "call_1",
                "vapi_call",
                json!({"action": "create_call", "phone_number": "+14155550100"}),
            )]),
        ),
        ("cannot call".to_string(), None),
    ]);
    let mut executor = executor_with(&client, 5, 10_000);
    executor.add_user_message("call my dentist".to_string());
    executor.execute().await.unwrap();

    let second_request = &client.requests()[1];
    let tool_msg = second_request.iter().find(|m| m.role == "tool").unwrap();
    assert!(tool_msg.content.contains("Error: Vapi not configured"));
}

#[tokio::test]
async fn test_stuck_detection_adds_strategy_hint() {
    let client = ScriptedClient::repeating((
        "Let me check the time again".to_string(),
        Some(vec![call("call_r", "get_datetime", json!({}))]),
    ));
    let mut executor = executor_with(&client, 4, 10_000);
    executor.add_user_message("time".to_string());
    executor.execute().await.unwrap();

    assert!(executor.is_stuck());
    let prompt = executor.next_step_prompt().unwrap();
    assert!(prompt.starts_with(STUCK_PROMPT));
    // The hint is only prepended once
    assert_eq!(prompt.matches(STUCK_PROMPT).count(), 1);

    let last_request = client.requests().pop().unwrap();
    assert!(last_request
        .last()
        .unwrap()
        .content
        .starts_with(STUCK_PROMPT));
}

#[tokio::test]
async fn test_missing_call_ids_are_generated() {
    let mut nameless = call("", "get_datetime", json!({}));
    nameless.id = None;
    let client = ScriptedClient::new(vec![
        (String::new(), Some(vec![nameless])),
        ("done".to_string(), None),
    ]);
    let mut executor = executor_with(&client, 5, 10_000);
    executor.add_user_message("time".to_string());
    executor.execute().await.unwrap();

    let history = executor.get_conversation_history();
    let assistant = history.iter().find(|m| m.tool_calls.is_some()).unwrap();
    let id = assistant.tool_calls.as_ref().unwrap()[0].id.clone().unwrap();
    assert!(id.starts_with("call_"));
    let tool_msg = history.iter().find(|m| m.role == "tool").unwrap();
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some(id.as_str()));
}

#[tokio::test]
async fn test_progress_sender_receives_updates() {
    let (sender, mut receiver) = mpsc::channel::<String>(32);
    let client = ScriptedClient::new(vec![("done".to_string(), None)]);
    let mut executor = executor_with(&client, 5, 10_000).with_progress_sender(sender);
    executor.add_user_message("hi".to_string());
    executor.execute().await.unwrap();

    let first = receiver.recv().await.unwrap();
    assert!(first.contains("Step 1/5"));
}

#[tokio::test]
async fn test_llm_failure_propagates() {
    let client = ScriptedClient::new(vec![]);
    let mut executor = executor_with(&client, 5, 10_000);
    executor.add_user_message("hi".to_string());
    assert!(executor.execute().await.is_err());
}
