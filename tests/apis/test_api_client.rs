//! Unit tests for the provider-neutral message types

use deptheon::apis::api_client::{CompletionOptions, Message, ToolCall};
use serde_json::json;

#[test]
fn test_message_creation() {
    let system_msg = Message::system("Test system message".to_string());
    assert_eq!(system_msg.role, "system");
    assert_eq!(system_msg.content, "Test system message");

    let user_msg = Message::user("Test user message".to_string());
    assert_eq!(user_msg.role, "user");
    assert!(user_msg.tool_calls.is_none());

    let assistant_msg = Message::assistant("Test assistant message".to_string());
    assert_eq!(assistant_msg.role, "assistant");
    assert!(assistant_msg.tool_call_id.is_none());
}

#[test]
fn test_tool_messages() {
    let call = ToolCall {
        id: Some("call_1".to_string()),
        name: "python_execute".to_string(),
        arguments: json!({"code": "print(2 + 2)"}),
    };
    let assistant = Message::assistant_with_tools(String::new(), vec![call.clone()]);
    assert_eq!(assistant.role, "assistant");
    assert_eq!(assistant.tool_calls, Some(vec![call]));

    let result = Message::tool("call_1".to_string(), "4".to_string());
    assert_eq!(result.role, "tool");
    assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
}

#[test]
fn test_plain_messages_serialize_without_tool_fields() {
    let value = serde_json::to_value(Message::user("hi".to_string())).unwrap();
    assert_eq!(value, json!({"role": "user", "content": "hi"}));
}

#[test]
fn test_completion_options_default() {
    let options = CompletionOptions::default();
    assert_eq!(options.temperature, Some(0.0));
    assert_eq!(options.max_tokens, Some(4096));
    assert!(options.top_p.is_none());
    assert!(options.tools.is_none());
    assert!(!options.require_tool_use);
}
