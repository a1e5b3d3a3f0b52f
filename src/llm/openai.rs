//! OpenAI-compatible API client.
//!
//! Talks to `/chat/completions` on the configured base URL, sending the
//! action catalog as `function` tools and mapping `tool_calls` back into
//! [`ContentBlock::ToolUse`] blocks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::types::{ChatOptions, ChatResponse, ContentBlock, LlmChat, LlmError, Message, Tool};

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    /// Build a client. Only a connect timeout is applied; a slow completion
    /// holds the request until the provider answers or drops the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(api_key: String, model: String, base_url: String, connect_timeout_secs: u64) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url: base_url.trim_end_matches('/').to_string(), model })
    }

    async fn send_json(&self, path: &str, body: &impl Serialize) -> Result<String, LlmError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        if status != 200 {
            return Err(LlmError::ApiResponse { status, body: text });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl LlmChat for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[Tool],
        options: &ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        let body = build_request(&self.model, messages, tools, options);
        let text = self.send_json("/chat/completions", &body).await?;
        parse_chat_completions_response(&text)
    }
}

// =============================================================================
// CHAT COMPLETIONS WIRE TYPES
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<CcToolDef<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct CcToolDef<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: CcFunctionDef<'a>,
}

#[derive(Serialize)]
struct CcFunctionDef<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

impl<'a> From<&'a Tool> for CcToolDef<'a> {
    fn from(tool: &'a Tool) -> Self {
        Self {
            tool_type: "function",
            function: CcFunctionDef {
                name: &tool.name,
                description: &tool.description,
                parameters: &tool.input_schema,
            },
        }
    }
}

/// `tools` and `tool_choice` are omitted together when the catalog is empty;
/// the API rejects a `tool_choice` without tools.
fn build_request<'a>(
    model: &'a str,
    messages: &'a [Message],
    tools: &'a [Tool],
    options: &ChatOptions,
) -> CcRequest<'a> {
    let (tools, tool_choice) = if tools.is_empty() {
        (None, None)
    } else {
        (Some(tools.iter().map(CcToolDef::from).collect()), Some(options.tool_choice))
    };
    CcRequest {
        model,
        messages,
        tools,
        tool_choice,
        temperature: options.temperature,
        max_tokens: options.max_tokens,
    }
}

// =============================================================================
// RESPONSE PARSING
// =============================================================================

#[derive(Deserialize)]
struct CcResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<CcChoice>,
    usage: Option<CcUsage>,
}

#[derive(Deserialize)]
struct CcUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct CcChoice {
    finish_reason: Option<String>,
    message: Option<CcReplyMessage>,
}

#[derive(Deserialize)]
struct CcReplyMessage {
    content: Option<String>,
    tool_calls: Option<Vec<CcReplyToolCall>>,
}

#[derive(Deserialize)]
struct CcReplyToolCall {
    id: Option<String>,
    function: Option<CcReplyFunction>,
}

/// `arguments` stays a raw [`Value`] so a non-string payload is reported
/// as a bad tool call rather than a generic body parse failure.
#[derive(Deserialize)]
struct CcReplyFunction {
    name: Option<String>,
    arguments: Option<Value>,
}

pub(crate) fn parse_chat_completions_response(json_text: &str) -> Result<ChatResponse, LlmError> {
    let root: CcResponse = serde_json::from_str(json_text).map_err(|e| LlmError::ApiParse(e.to_string()))?;
    let Some(choice) = root.choices.into_iter().next() else {
        return Err(LlmError::ApiParse("chat_completions: missing choices[0]".to_string()));
    };
    let (input_tokens, output_tokens) = root
        .usage
        .map_or((0, 0), |u| (u.prompt_tokens, u.completion_tokens));

    let mut content = Vec::new();
    let mut has_tool_calls = false;
    if let Some(message) = choice.message {
        if let Some(text) = message.content.filter(|t| !t.is_empty()) {
            content.push(ContentBlock::Text { text });
        }
        for (index, call) in message.tool_calls.unwrap_or_default().into_iter().enumerate() {
            content.push(tool_call_block(index, call)?);
            has_tool_calls = true;
        }
    }

    let stop_reason = if has_tool_calls {
        "tool_use"
    } else if choice.finish_reason.as_deref() == Some("length") {
        "max_tokens"
    } else {
        "end_turn"
    };

    Ok(ChatResponse {
        content,
        model: root.model.unwrap_or_default(),
        stop_reason: stop_reason.to_string(),
        input_tokens,
        output_tokens,
    })
}

/// A tool call needs an id, a function name, and an `arguments` string holding
/// valid JSON. Anything less fails the whole response.
fn tool_call_block(index: usize, call: CcReplyToolCall) -> Result<ContentBlock, LlmError> {
    let bad = |what: String| LlmError::ApiParse(format!("chat_completions: tool call {index}: {what}"));

    let id = call.id.ok_or_else(|| bad("missing id".into()))?;
    let function = call.function.ok_or_else(|| bad("missing function".into()))?;
    let name = function
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| bad("missing function name".into()))?;
    let Some(Value::String(args)) = function.arguments else {
        return Err(bad(format!("{name}: arguments missing or not a string")));
    };
    let input = serde_json::from_str::<Value>(&args).map_err(|e| bad(format!("{name}: invalid arguments: {e}")))?;

    Ok(ContentBlock::ToolUse { id, name, input })
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
