//! Copilot service: chat message + app snapshot → LLM → reply and actions.
//!
//! DESIGN
//! ======
//! One linear pipeline per request, no state carried between requests:
//!
//! 1. refuse early when no usable API key is configured
//! 2. render the system prompt from the caller's `AppContext`
//! 3. system turn + last `MAX_HISTORY` history turns + the new user turn
//! 4. a single completion call with the action catalog, `tool_choice=auto`
//! 5. every tool call becomes an `ActionCommand`, in call order
//! 6. suggestion chips come from a static table keyed by `currentView`
//!
//! Any failure after step 1 collapses into `CopilotError::Processing` with the
//! underlying cause as its message. No partial responses.

use std::fmt::Write as _;
use std::io;

use serde::{Deserialize, Serialize};
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::{Map, Value};
use tracing::info;

use crate::llm::tools::copilot_tools;
use crate::llm::types::{self, ChatOptions, ContentBlock, LlmError, Message};
use crate::state::AppState;

pub const FALLBACK_REPLY: &str = "Done! I've executed that action for you.";
pub const NO_DATA: &str = "No data available";
pub const UNKNOWN: &str = "Unknown";
/// Hard cap, in characters, on each serialized data blob in the prompt.
pub const MAX_BLOB_CHARS: usize = 3000;
/// History turns forwarded to the model; older turns are dropped.
pub const MAX_HISTORY: usize = 10;

pub const CHAT_OPTIONS: ChatOptions = ChatOptions { temperature: 0.3, max_tokens: 1000, tool_choice: "auto" };

const DEFAULT_SUGGESTIONS: [&str; 3] = [
    "How many employees are working today?",
    "What supplies are running low?",
    "Show me today's schedule",
];

const SUGGESTIONS_BY_VIEW: &[(&str, [&str; 3])] = &[
    (
        "calendar",
        ["Who's working today?", "Any scheduling conflicts?", "Show me tomorrow's appointments"],
    ),
    (
        "equipment",
        ["Any equipment needing maintenance?", "Show equipment by status", "What's the most used equipment?"],
    ),
    ("supplies", ["What supplies are running low?", "Show me reorder list", "Total inventory value?"]),
    ("task-hub", ["Any overdue tasks?", "Who has the most tasks?", "Show unassigned tasks"]),
    (
        "instruments",
        [
            "Any instruments needing sterilization?",
            "Show instrument count by type",
            "What instruments need replacement?",
        ],
    ),
];

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CopilotError {
    #[error("OpenAI API key not configured. Set OPENAI_API_KEY in .env")]
    NotConfigured,
    #[error("AI processing error: {0}")]
    Processing(String),
}

impl CopilotError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "E_NOT_CONFIGURED",
            Self::Processing(_) => "E_PROCESSING",
        }
    }
}

impl From<LlmError> for CopilotError {
    fn from(e: LlmError) -> Self {
        Self::Processing(e.to_string())
    }
}

impl From<serde_json::Error> for CopilotError {
    fn from(e: serde_json::Error) -> Self {
        Self::Processing(e.to_string())
    }
}

/// Caller-owned data summary. Shape is opaque to the relay.
pub type DataBlob = Map<String, Value>;

/// Snapshot of the dental app's state sent with each message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppContext {
    pub current_view: Option<String>,
    pub user_role: Option<String>,
    pub user_name: Option<String>,
    pub current_date: Option<String>,
    pub schedule_data: Option<DataBlob>,
    pub staff_data: Option<DataBlob>,
    pub equipment_data: Option<DataBlob>,
    pub instruments_data: Option<DataBlob>,
    pub supplies_data: Option<DataBlob>,
    pub vendors_data: Option<DataBlob>,
    pub tasks_data: Option<DataBlob>,
    pub procedures_data: Option<DataBlob>,
    pub clinics_data: Option<DataBlob>,
    pub rooms_data: Option<DataBlob>,
}

impl AppContext {
    /// Data blobs paired with their prompt section title, in prompt order.
    fn data_sections(&self) -> [(&'static str, Option<&DataBlob>); 10] {
        [
            ("Schedule Data", self.schedule_data.as_ref()),
            ("Staff Data", self.staff_data.as_ref()),
            ("Equipment Data", self.equipment_data.as_ref()),
            ("Instruments Data", self.instruments_data.as_ref()),
            ("Supplies Data", self.supplies_data.as_ref()),
            ("Vendors Data", self.vendors_data.as_ref()),
            ("Tasks Data", self.tasks_data.as_ref()),
            ("Procedures Data", self.procedures_data.as_ref()),
            ("Clinics Data", self.clinics_data.as_ref()),
            ("Rooms Data", self.rooms_data.as_ref()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A prior conversation turn, resent by the caller on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub context: Option<AppContext>,
    pub history: Option<Vec<ChatMessage>>,
}

/// An action for the calling app to execute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionCommand {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: Option<String>,
    pub data: Option<DataBlob>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub actions: Vec<ActionCommand>,
    pub suggestions: Vec<String>,
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Run one chat request through the LLM.
///
/// # Errors
///
/// [`CopilotError::NotConfigured`] before any outbound call when no usable key
/// is configured; [`CopilotError::Processing`] when the client failed to build
/// at startup, and for any later failure.
pub async fn handle_chat(state: &AppState, request: ChatRequest) -> Result<ChatResponse, CopilotError> {
    if !state.config.api_key_configured() {
        return Err(CopilotError::NotConfigured);
    }
    let Some(llm) = state.llm.as_ref() else {
        return Err(match &state.llm_init_error {
            Some(cause) => CopilotError::Processing(format!("LLM client unavailable: {cause}")),
            None => CopilotError::NotConfigured,
        });
    };

    let context = request.context.as_ref();
    let view = context.and_then(|c| c.current_view.as_deref());
    let history = request.history.as_deref().unwrap_or_default();
    info!(
        message_len = request.message.len(),
        history_len = history.len(),
        view = view.unwrap_or_default(),
        "copilot: chat received"
    );

    let system = build_system_prompt(context)?;
    let messages = build_messages(system, history, &request.message);
    let tools = copilot_tools();

    let response = llm.chat(&messages, &tools, &CHAT_OPTIONS).await?;
    info!(
        model = %response.model,
        stop_reason = %response.stop_reason,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        "copilot: LLM response"
    );

    let (reply, actions) = translate_response(&response)?;
    if !actions.is_empty() {
        info!(actions = actions.len(), "copilot: returning actions");
    }

    Ok(ChatResponse { reply, actions, suggestions: suggestions_for_view(view) })
}

// =============================================================================
// PROMPT
// =============================================================================

/// Render the system prompt with user details and the ten data sections.
///
/// # Errors
///
/// Returns an error if a data blob fails to serialize.
pub fn build_system_prompt(context: Option<&AppContext>) -> Result<String, serde_json::Error> {
    let fallback = AppContext::default();
    let ctx = context.unwrap_or(&fallback);

    let current_datetime = non_empty(ctx.current_date.as_deref()).map_or_else(local_timestamp, str::to_owned);
    let user_name = non_empty(ctx.user_name.as_deref()).unwrap_or(UNKNOWN);
    let user_role = non_empty(ctx.user_role.as_deref()).unwrap_or(UNKNOWN);
    let current_view = non_empty(ctx.current_view.as_deref()).unwrap_or(UNKNOWN);

    let mut prompt = format!(
        r"You are ReformDental Copilot, an AI assistant embedded in a dental practice management application called ReformDental.

## Your Role
You help dental office staff with scheduling, inventory, tasks, procedures, and general office management. You are knowledgeable, professional, helpful, and concise.

## Current Date/Time
{current_datetime}

## Current User
- Name: {user_name}
- Role: {user_role}
- Current View: {current_view}

## Capabilities
You can answer questions about AND take actions on:
1. **Scheduling** - View today's schedule, who's working, room availability
2. **Staff** - Employee info, roles, who's on duty
3. **Equipment** - Equipment inventory, status, maintenance needs
4. **Instruments** - Instrument inventory and availability
5. **Supplies** - Supply stock levels, reorder needs
6. **Tasks** - Task assignments, status, workload
7. **Procedures** - Dental procedure info, required instruments/supplies
8. **Vendors** - Vendor contact info, orders
9. **Navigation** - Navigate the user to any page/section in the app
10. **Clinics & Rooms** - Office/clinic info, room assignments

## Response Format Rules
- Be concise and direct. No filler text.
- Use bullet points for lists.
- When you have data, give specific numbers and names.
- If data is not available in the context, say so honestly.
- When suggesting an action, include it in the function call.

## App Data Context
The following data is from the live application:
"
    );

    for (title, blob) in ctx.data_sections() {
        let _ = write!(prompt, "\n### {title}\n{}\n", format_blob(blob)?);
    }

    Ok(prompt)
}

/// Pretty-printed, ASCII-only JSON cut to [`MAX_BLOB_CHARS`], or [`NO_DATA`]
/// when the blob is absent or empty. The cap counts the escaped text, and the
/// cut can land mid-structure or mid-escape.
///
/// # Errors
///
/// Returns an error if the blob fails to serialize.
pub fn format_blob(blob: Option<&DataBlob>) -> Result<String, serde_json::Error> {
    match blob {
        Some(map) if !map.is_empty() => Ok(truncate_chars(to_ascii_pretty(map)?, MAX_BLOB_CHARS)),
        _ => Ok(NO_DATA.to_string()),
    }
}

fn to_ascii_pretty(value: &impl Serialize) -> Result<String, serde_json::Error> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut out, AsciiPrettyFormatter::default());
    value.serialize(&mut ser)?;
    // Every byte written is ASCII.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Two-space pretty printing with every character from DEL upward written as
/// lowercase `\uXXXX` escapes, one per UTF-16 unit.
#[derive(Default)]
struct AsciiPrettyFormatter(PrettyFormatter<'static>);

impl Formatter for AsciiPrettyFormatter {
    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if ch < '\u{7f}' {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..idx])?;
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                writer.write_all(format!("\\u{unit:04x}").as_bytes())?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }
}

fn truncate_chars(mut s: String, max_chars: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max_chars) {
        s.truncate(idx);
    }
    s
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Server local time as `YYYY-MM-DD HH:MM`.
fn local_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M").to_string()
}

// =============================================================================
// MESSAGES
// =============================================================================

/// System turn, then the most recent [`MAX_HISTORY`] history turns in order,
/// then the new user message.
#[must_use]
pub fn build_messages(system: String, history: &[ChatMessage], message: &str) -> Vec<Message> {
    let recent = &history[history.len().saturating_sub(MAX_HISTORY)..];
    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(Message::system(system));
    messages.extend(
        recent
            .iter()
            .map(|m| Message { role: m.role.as_str().to_string(), content: m.content.clone() }),
    );
    messages.push(Message::user(message));
    messages
}

// =============================================================================
// RESPONSE TRANSLATION
// =============================================================================

/// Map the model output to `(reply, actions)`.
///
/// # Errors
///
/// Returns an error if a tool call's arguments are not a JSON object.
pub fn translate_response(response: &types::ChatResponse) -> Result<(String, Vec<ActionCommand>), CopilotError> {
    let mut actions = Vec::new();
    for block in &response.content {
        let ContentBlock::ToolUse { name, input, .. } = block else {
            continue;
        };
        let Value::Object(args) = input else {
            return Err(CopilotError::Processing(format!("tool call {name}: arguments are not a JSON object")));
        };
        actions.push(ActionCommand { kind: name.clone(), target: None, data: Some(args.clone()) });
    }

    let text = response.text();
    let reply = if text.is_empty() && !actions.is_empty() { FALLBACK_REPLY.to_string() } else { text };
    Ok((reply, actions))
}

// =============================================================================
// SUGGESTIONS
// =============================================================================

/// Three follow-up chips for the caller's current view.
#[must_use]
pub fn suggestions_for_view(view: Option<&str>) -> Vec<String> {
    let chips = view
        .and_then(|v| SUGGESTIONS_BY_VIEW.iter().find(|(name, _)| *name == v))
        .map_or(&DEFAULT_SUGGESTIONS, |(_, chips)| chips);
    chips.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
#[path = "copilot_test.rs"]
mod tests;
