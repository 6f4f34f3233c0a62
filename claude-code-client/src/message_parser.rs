//! Message parsing
//!
//! Converts raw JSON envelopes from the CLI output stream into strongly
//! typed [`Message`] values. Parsing is pure: no I/O, no mutation of the
//! input. Envelopes that do not satisfy the wire contract are rejected with
//! [`SdkError::MessageParseError`] carrying the offending payload.

use crate::{
    errors::{Result, SdkError},
    types::{
        AssistantMessage, ContentBlock, Message, TextContent, ThinkingContent, ToolResultContent,
        ToolUseContent, UserContent, UserMessage,
    },
};
use serde_json::Value;

/// Parse a JSON envelope into a typed conversation message
pub fn parse_message(json: &Value) -> Result<Message> {
    let msg_type = match json.get("type") {
        Some(Value::String(t)) => t.as_str(),
        Some(_) => {
            return Err(SdkError::parse_error(
                "Field 'type' is not a string",
                json.to_string(),
            ))
        }
        None => {
            return Err(SdkError::parse_error(
                "Missing 'type' field",
                json.to_string(),
            ))
        }
    };

    match msg_type {
        "user" => parse_user_message(json),
        "assistant" => parse_assistant_message(json),
        "system" => parse_system_message(json),
        "result" => parse_result_message(json),
        other => Err(SdkError::parse_error(
            format!("Unknown message type: {other}"),
            json.to_string(),
        )),
    }
}

fn parse_user_message(json: &Value) -> Result<Message> {
    let message = json
        .get("message")
        .ok_or_else(|| SdkError::parse_error("Missing 'message' field", json.to_string()))?;

    // Content is either a plain prompt string or an array of content
    // blocks (the CLI echoes tool results back as a user message).
    let content = match message.get("content") {
        Some(Value::String(text)) => UserContent::Text(text.clone()),
        Some(Value::Array(items)) => {
            let mut blocks = Vec::with_capacity(items.len());
            for item in items {
                blocks.push(parse_content_block(item)?);
            }
            UserContent::Blocks(blocks)
        }
        _ => {
            return Err(SdkError::parse_error(
                "Missing or invalid 'content' field",
                json.to_string(),
            ))
        }
    };

    Ok(Message::User {
        message: UserMessage { content },
    })
}

fn parse_assistant_message(json: &Value) -> Result<Message> {
    let message = json
        .get("message")
        .ok_or_else(|| SdkError::parse_error("Missing 'message' field", json.to_string()))?;

    let content_array = message
        .get("content")
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            SdkError::parse_error("Missing or invalid 'content' array", json.to_string())
        })?;

    let model = message
        .get("model")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            SdkError::parse_error("Missing or invalid 'model' field", json.to_string())
        })?;

    let mut content = Vec::with_capacity(content_array.len());
    for item in content_array {
        content.push(parse_content_block(item)?);
    }

    Ok(Message::Assistant {
        message: AssistantMessage {
            content,
            model: model.to_string(),
        },
    })
}

/// Parse a single content block
fn parse_content_block(json: &Value) -> Result<ContentBlock> {
    let block_type = json
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            SdkError::parse_error("Missing 'type' field in content block", json.to_string())
        })?;

    match block_type {
        "text" => {
            let text = json.get("text").and_then(|v| v.as_str()).ok_or_else(|| {
                SdkError::parse_error("Missing 'text' field in text block", json.to_string())
            })?;
            Ok(ContentBlock::Text(TextContent {
                text: text.to_string(),
            }))
        }
        "thinking" => {
            let thinking = json
                .get("thinking")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    SdkError::parse_error(
                        "Missing 'thinking' field in thinking block",
                        json.to_string(),
                    )
                })?;
            let signature = json
                .get("signature")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    SdkError::parse_error(
                        "Missing 'signature' field in thinking block",
                        json.to_string(),
                    )
                })?;
            Ok(ContentBlock::Thinking(ThinkingContent {
                thinking: thinking.to_string(),
                signature: signature.to_string(),
            }))
        }
        "tool_use" => {
            let id = json.get("id").and_then(|v| v.as_str()).ok_or_else(|| {
                SdkError::parse_error("Missing 'id' field in tool_use block", json.to_string())
            })?;
            let name = json.get("name").and_then(|v| v.as_str()).ok_or_else(|| {
                SdkError::parse_error("Missing 'name' field in tool_use block", json.to_string())
            })?;
            let input = json
                .get("input")
                .cloned()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

            Ok(ContentBlock::ToolUse(ToolUseContent {
                id: id.to_string(),
                name: name.to_string(),
                input,
            }))
        }
        "tool_result" => {
            let tool_use_id = json
                .get("tool_use_id")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    SdkError::parse_error(
                        "Missing 'tool_use_id' field in tool_result block",
                        json.to_string(),
                    )
                })?;

            // Absent content and absent is_error stay absent; the wire
            // tri-state is preserved in the typed block.
            let content = json.get("content").cloned();
            let is_error = json.get("is_error").and_then(|v| v.as_bool());

            Ok(ContentBlock::ToolResult(ToolResultContent {
                tool_use_id: tool_use_id.to_string(),
                content,
                is_error,
            }))
        }
        other => Err(SdkError::parse_error(
            format!("Unknown content block type: {other}"),
            json.to_string(),
        )),
    }
}

fn parse_system_message(json: &Value) -> Result<Message> {
    let subtype = json
        .get("subtype")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            SdkError::parse_error("Missing 'subtype' field in system message", json.to_string())
        })?;

    // The attribute bag is the whole envelope, retained verbatim.
    Ok(Message::System {
        subtype: subtype.to_string(),
        data: json.clone(),
    })
}

fn parse_result_message(json: &Value) -> Result<Message> {
    let subtype = require_str(json, "subtype")?;
    let duration_ms = require_i64(json, "duration_ms")?;
    let duration_api_ms = require_i64(json, "duration_api_ms")?;
    let is_error = json
        .get("is_error")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| {
            SdkError::parse_error("Missing or invalid 'is_error' field", json.to_string())
        })?;
    let num_turns = require_i64(json, "num_turns")? as i32;
    let session_id = require_str(json, "session_id")?;

    Ok(Message::Result {
        subtype,
        duration_ms,
        duration_api_ms,
        is_error,
        num_turns,
        session_id,
        total_cost_usd: json.get("total_cost_usd").and_then(|v| v.as_f64()),
        usage: json.get("usage").cloned(),
        result: json
            .get("result")
            .and_then(|v| v.as_str())
            .map(String::from),
    })
}

fn require_str(json: &Value, field: &str) -> Result<String> {
    json.get(field)
        .and_then(|v| v.as_str())
        .map(String::from)
        .ok_or_else(|| {
            SdkError::parse_error(
                format!("Missing or invalid '{field}' field"),
                json.to_string(),
            )
        })
}

fn require_i64(json: &Value, field: &str) -> Result<i64> {
    json.get(field).and_then(|v| v.as_i64()).ok_or_else(|| {
        SdkError::parse_error(
            format!("Missing or invalid '{field}' field"),
            json.to_string(),
        )
    })
}
