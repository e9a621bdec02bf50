//! Tests for tool-call parsing and dispatch

use crate::common::test_config;
use deptheon::agent::tools::{
    get_tool_definitions, parse_tool_call, ToolCall, ToolCollection, COMPOSIO_TOOL, DATETIME_TOOL,
    PYTHON_TOOL, TERMINATE_TOOL, VAPI_TOOL,
};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn test_tool_definitions_cover_every_tool() {
    let definitions = get_tool_definitions();
    let names: Vec<&str> = definitions
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![COMPOSIO_TOOL, VAPI_TOOL, PYTHON_TOOL, DATETIME_TOOL, TERMINATE_TOOL]
    );

    for definition in &definitions {
        assert!(definition["description"].is_string());
        assert_eq!(definition["parameters"]["type"], "object");
    }

    let composio = &definitions[0];
    assert_eq!(composio["parameters"]["required"], json!(["action"]));
    let python = &definitions[2];
    assert_eq!(python["parameters"]["required"], json!(["code"]));
}

#[test]
fn test_parse_tool_call_variants() {
    let parsed = parse_tool_call(
        COMPOSIO_TOOL,
        &json!({"action": "get_tool_info", "tool_name": "github"}),
    )
    .unwrap();
    match parsed {
        ToolCall::Composio(params) => {
            assert_eq!(params.action, "get_tool_info");
            assert_eq!(params.tool_name.as_deref(), Some("github"));
        }
        other => panic!("unexpected tool call: {:?}", other),
    }

    let parsed = parse_tool_call(
        VAPI_TOOL,
        &json!({
            "action": "create_call",
            "phone_number": "+14155550100",
            "assistant_config": {"firstMessage": "Hi!", "maxDurationSeconds": 120}
        }),
    )
    .unwrap();
    match parsed {
        ToolCall::Vapi(params) => {
            let config = params.assistant_config.unwrap();
            assert_eq!(config.first_message.as_deref(), Some("Hi!"));
            assert_eq!(config.max_duration_seconds, Some(120));
        }
        other => panic!("unexpected tool call: {:?}", other),
    }

    let parsed = parse_tool_call(PYTHON_TOOL, &json!({"code": "print(1)", "timeout": 3})).unwrap();
    assert_eq!(parsed.name(), PYTHON_TOOL);

    let parsed = parse_tool_call(DATETIME_TOOL, &json!({})).unwrap();
    assert!(matches!(parsed, ToolCall::DateTime));
    assert!(!parsed.is_special());
}

#[test]
fn test_parse_terminate_defaults() {
    let parsed = parse_tool_call(TERMINATE_TOOL, &serde_json::Value::Null).unwrap();
    match &parsed {
        ToolCall::Terminate(params) => assert_eq!(params.status, "success"),
        other => panic!("unexpected tool call: {:?}", other),
    }
    assert!(parsed.is_special());

    let parsed = parse_tool_call(TERMINATE_TOOL, &json!({"status": "failure"})).unwrap();
    match parsed {
        ToolCall::Terminate(params) => assert_eq!(params.status, "failure"),
        other => panic!("unexpected tool call: {:?}", other),
    }
}

#[test]
fn test_parse_errors() {
    let err = parse_tool_call("rm_rf", &json!({})).unwrap_err();
    assert_eq!(err.to_string(), "Unknown tool: rm_rf");

    let err = parse_tool_call(PYTHON_TOOL, &json!({"timeout": 3})).unwrap_err();
    assert_eq!(err.to_string(), "Failed to parse python_execute parameters");
    assert!(format!("{:#}", err).contains("code"));
}

#[test]
fn test_tool_call_serialization() {
    let parsed = parse_tool_call(TERMINATE_TOOL, &json!({"status": "success"})).unwrap();
    let value = serde_json::to_value(&parsed).unwrap();
    assert_eq!(value["tool"], "Terminate");
    assert_eq!(value["params"]["status"], "success");
}

#[tokio::test]
async fn test_collection_dispatch() {
    let dir = tempdir().unwrap();
    let tools = ToolCollection::from_config(&test_config(dir.path(), &[]));
    assert_eq!(tools.definitions().len(), 5);

    let output = tools
        .execute(&parse_tool_call(DATETIME_TOOL, &json!({})).unwrap())
        .await;
    assert!(!output.is_error());
    assert!(output.to_string().starts_with("Current date and time: "));

    let output = tools
        .execute(&parse_tool_call(TERMINATE_TOOL, &json!({"status": "failure"})).unwrap())
        .await;
    assert_eq!(
        output.to_string(),
        "The interaction has been completed with status: failure"
    );

    let output = tools
        .execute(&parse_tool_call(COMPOSIO_TOOL, &json!({"action": "list_tools"})).unwrap())
        .await;
    assert!(output.is_error());
    assert_eq!(
        output.error.as_deref(),
        Some("Composio is not properly initialized. Please set COMPOSIO_API_KEY")
    );

    let output = tools
        .execute(&parse_tool_call(VAPI_TOOL, &json!({"action": "list_calls"})).unwrap())
        .await;
    assert_eq!(
        output.to_string(),
        "Error: Vapi not configured. Please set VAPI_API_KEY environment variable."
    );
}
