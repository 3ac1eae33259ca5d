use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use wicket_common::{AgentRequest, AgentResponse, Priority};

use crate::handlers::error_status;
use crate::state::AppState;

/// Subset of the OpenAI chat-completions request the gateway understands.
/// Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    /// Plain string or an array of typed content parts.
    #[serde(default)]
    pub content: Value,
}

impl ChatCompletionRequest {
    /// Flatten chat messages into one prompt plus an optional system prompt.
    pub fn to_agent_request(&self) -> AgentRequest {
        let mut system_parts = Vec::new();
        let mut prompt_parts = Vec::new();

        for msg in &self.messages {
            let text = content_text(&msg.content);
            if text.is_empty() {
                continue;
            }
            if msg.role == "system" {
                system_parts.push(text);
            } else {
                prompt_parts.push(text);
            }
        }

        AgentRequest {
            prompt: prompt_parts.join("\n"),
            model: normalize_model_tag(self.model.as_deref()),
            system_prompt: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n"))
            },
            max_turns: None,
            timeout_ms: None,
            priority: Priority::Normal,
        }
    }
}

fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Map any vendor model id onto the CLI's short tags; unrecognised ids fall
/// through to the CLI default.
fn normalize_model_tag(model: Option<&str>) -> Option<String> {
    let model = model?;
    for tag in ["opus", "sonnet", "haiku"] {
        if model.contains(tag) {
            return Some(tag.to_string());
        }
    }
    None
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn build_chat_completion(model_hint: &str, resp: &AgentResponse) -> Value {
    let input_tokens = resp.input_tokens.unwrap_or(0);
    let output_tokens = resp.output_tokens.unwrap_or(0);

    json!({
        "id": format!("chatcmpl-{}", Uuid::new_v4().simple()),
        "object": "chat.completion",
        "created": now_unix_seconds(),
        "model": resp.model.clone().unwrap_or_else(|| model_hint.to_string()),
        "choices": [
            {
                "index": 0,
                "message": {"role": "assistant", "content": resp.text},
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": input_tokens,
            "completion_tokens": output_tokens,
            "total_tokens": input_tokens + output_tokens
        }
    })
}

fn error_body(message: &str, kind: &str) -> Value {
    json!({"error": {"message": message, "type": kind}})
}

pub async fn chat_completions(
    State(st): State<AppState>,
    Json(req): Json<ChatCompletionRequest>,
) -> Response {
    let agent_req = req.to_agent_request();
    if agent_req.prompt.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_body(
                "no user content in messages",
                "invalid_request_error",
            )),
        )
            .into_response();
    }

    let model_hint = req.model.as_deref().unwrap_or("claude");
    match st.scheduler.submit(agent_req).await {
        Ok(resp) => {
            (StatusCode::OK, Json(build_chat_completion(model_hint, &resp))).into_response()
        }
        Err(e) => (
            error_status(&e),
            Json(error_body(&e.to_string(), "gateway_error")),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_chat(model: Option<&str>, messages: Vec<(&str, Value)>) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.map(str::to_string),
            messages: messages
                .into_iter()
                .map(|(role, content)| ChatMessage {
                    role: role.to_string(),
                    content,
                })
                .collect(),
        }
    }

    #[test]
    fn flattens_user_and_system_messages() {
        let req = make_chat(
            Some("sonnet"),
            vec![
                ("system", json!("be terse")),
                ("user", json!("first")),
                ("user", json!("second")),
            ],
        );

        let agent = req.to_agent_request();
        assert_eq!(agent.prompt, "first\nsecond");
        assert_eq!(agent.system_prompt, Some("be terse".to_string()));
        assert_eq!(agent.model, Some("sonnet".to_string()));
    }

    #[test]
    fn extracts_typed_content_parts() {
        let req = make_chat(
            None,
            vec![(
                "user",
                json!([
                    {"type": "text", "text": "part one"},
                    {"type": "image_url", "image_url": {"url": "ignored"}},
                    {"type": "text", "text": "part two"}
                ]),
            )],
        );

        let agent = req.to_agent_request();
        assert_eq!(agent.prompt, "part one\npart two");
    }

    #[test]
    fn vendor_model_ids_map_to_short_tags() {
        assert_eq!(
            normalize_model_tag(Some("claude-3-opus-20240229")),
            Some("opus".to_string())
        );
        assert_eq!(normalize_model_tag(Some("haiku")), Some("haiku".to_string()));
        assert_eq!(normalize_model_tag(Some("gpt-4o")), None);
        assert_eq!(normalize_model_tag(None), None);
    }

    #[test]
    fn completion_reports_usage_totals() {
        let resp = AgentResponse {
            text: "hello".to_string(),
            model: Some("sonnet".to_string()),
            input_tokens: Some(10),
            output_tokens: Some(5),
            error: None,
        };

        let body = build_chat_completion("claude", &resp);
        assert_eq!(body["model"], "sonnet");
        assert_eq!(body["choices"][0]["message"]["content"], "hello");
        assert_eq!(body["usage"]["total_tokens"], 15);
    }
}
