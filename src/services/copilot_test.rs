use super::*;
use crate::llm::types::LlmChat;
use crate::state::test_helpers::{self, MockLlm};
use serde_json::json;
use std::sync::Arc;

fn blob(value: Value) -> DataBlob {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn history(n: usize) -> Vec<ChatMessage> {
    (0..n)
        .map(|i| ChatMessage {
            role: if i % 2 == 0 { ChatRole::User } else { ChatRole::Assistant },
            content: format!("turn {i}"),
        })
        .collect()
}

fn request(message: &str) -> ChatRequest {
    ChatRequest { message: message.into(), ..ChatRequest::default() }
}

// =========================================================================
// build_system_prompt
// =========================================================================

#[test]
fn prompt_defaults_to_unknown_and_no_data() {
    let prompt = build_system_prompt(None).unwrap();
    assert!(prompt.contains("- Name: Unknown"));
    assert!(prompt.contains("- Role: Unknown"));
    assert!(prompt.contains("- Current View: Unknown"));
    assert_eq!(prompt.matches(NO_DATA).count(), 10);
    assert!(prompt.contains("ReformDental Copilot"));
}

#[test]
fn prompt_uses_context_fields() {
    let ctx = AppContext {
        current_view: Some("supplies".into()),
        user_role: Some("Hygienist".into()),
        user_name: Some("Dana".into()),
        current_date: Some("2025-03-04 09:15".into()),
        ..AppContext::default()
    };
    let prompt = build_system_prompt(Some(&ctx)).unwrap();
    assert!(prompt.contains("## Current Date/Time\n2025-03-04 09:15\n"));
    assert!(prompt.contains("- Name: Dana"));
    assert!(prompt.contains("- Role: Hygienist"));
    assert!(prompt.contains("- Current View: supplies"));
}

#[test]
fn prompt_empty_strings_fall_back() {
    let ctx = AppContext { user_name: Some(String::new()), ..AppContext::default() };
    let prompt = build_system_prompt(Some(&ctx)).unwrap();
    assert!(prompt.contains("- Name: Unknown"));
}

#[test]
fn prompt_without_date_uses_local_timestamp() {
    let prompt = build_system_prompt(None).unwrap();
    let line = prompt
        .split("## Current Date/Time\n")
        .nth(1)
        .and_then(|rest| rest.lines().next())
        .unwrap();
    assert_eq!(line.len(), 16, "expected YYYY-MM-DD HH:MM, got {line}");
    assert_eq!(&line[4..5], "-");
    assert_eq!(&line[10..11], " ");
    assert_eq!(&line[13..14], ":");
}

#[test]
fn prompt_renders_blob_under_its_section() {
    let ctx = AppContext {
        supplies_data: Some(blob(json!({ "lowStock": ["gloves"] }))),
        ..AppContext::default()
    };
    let prompt = build_system_prompt(Some(&ctx)).unwrap();
    let section = prompt.split("### Supplies Data\n").nth(1).unwrap();
    assert!(section.starts_with("{\n  \"lowStock\": [\n    \"gloves\"\n  ]\n}"));
    assert_eq!(prompt.matches(NO_DATA).count(), 9);
}

#[test]
fn prompt_sections_in_order() {
    let prompt = build_system_prompt(None).unwrap();
    let titles = [
        "### Schedule Data",
        "### Staff Data",
        "### Equipment Data",
        "### Instruments Data",
        "### Supplies Data",
        "### Vendors Data",
        "### Tasks Data",
        "### Procedures Data",
        "### Clinics Data",
        "### Rooms Data",
    ];
    let positions: Vec<usize> = titles.iter().map(|t| prompt.find(t).unwrap()).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

// =========================================================================
// format_blob
// =========================================================================

#[test]
fn format_blob_absent_or_empty() {
    assert_eq!(format_blob(None).unwrap(), NO_DATA);
    assert_eq!(format_blob(Some(&DataBlob::new())).unwrap(), NO_DATA);
}

#[test]
fn format_blob_truncates_to_cap() {
    let items: Vec<String> = (0..1000).map(|i| format!("item-{i}")).collect();
    let data = blob(json!({ "items": items }));
    let full = serde_json::to_string_pretty(&data).unwrap();
    assert!(full.chars().count() > MAX_BLOB_CHARS);

    let out = format_blob(Some(&data)).unwrap();
    assert_eq!(out.chars().count(), MAX_BLOB_CHARS);
    assert!(full.starts_with(&out));
}

#[test]
fn format_blob_keeps_short_blob_whole() {
    let data = blob(json!({ "count": 3 }));
    assert_eq!(format_blob(Some(&data)).unwrap(), "{\n  \"count\": 3\n}");
}

#[test]
fn format_blob_escapes_non_ascii() {
    let data = blob(json!({ "name": "José" }));
    assert_eq!(format_blob(Some(&data)).unwrap(), "{\n  \"name\": \"Jos\\u00e9\"\n}");
}

#[test]
fn format_blob_escapes_astral_as_surrogate_pair() {
    let data = blob(json!({ "note": "ok 😀", "keys": ["Zürich"] }));
    let out = format_blob(Some(&data)).unwrap();
    assert!(out.contains("\"ok \\ud83d\\ude00\""));
    assert!(out.contains("\"Z\\u00fcrich\""));
    assert!(out.is_ascii());
}

#[test]
fn format_blob_cap_counts_escaped_text() {
    // 1000 × "é" escapes to 6000 characters.
    let data = blob(json!({ "text": "é".repeat(1000) }));
    let out = format_blob(Some(&data)).unwrap();
    assert_eq!(out.len(), MAX_BLOB_CHARS);
    assert!(out.starts_with("{\n  \"text\": \"\\u00e9\\u00e9"));
}

#[test]
fn format_blob_keeps_control_escapes() {
    let data = blob(json!({ "memo": "a\nb\t\"c\"" }));
    assert_eq!(format_blob(Some(&data)).unwrap(), "{\n  \"memo\": \"a\\nb\\t\\\"c\\\"\"\n}");
}

#[test]
fn format_blob_preserves_key_order() {
    let data = blob(json!({ "zeta": 1, "alpha": 2 }));
    let out = format_blob(Some(&data)).unwrap();
    assert!(out.find("zeta").unwrap() < out.find("alpha").unwrap());
}

#[test]
fn truncate_counts_characters_not_bytes() {
    let s = "é".repeat(10);
    assert_eq!(truncate_chars(s, 4), "éééé");
    assert_eq!(truncate_chars("abc".into(), 10), "abc");
}

// =========================================================================
// build_messages
// =========================================================================

#[test]
fn messages_without_history() {
    let msgs = build_messages("sys".into(), &[], "hello");
    assert_eq!(msgs, vec![Message::system("sys"), Message::user("hello")]);
}

#[test]
fn messages_keep_last_ten_history_turns() {
    let hist = history(25);
    let msgs = build_messages("sys".into(), &hist, "now");
    assert_eq!(msgs.len(), MAX_HISTORY + 2);
    assert_eq!(msgs[0].role, "system");
    let forwarded: Vec<&str> = msgs[1..=MAX_HISTORY].iter().map(|m| m.content.as_str()).collect();
    let expected: Vec<String> = (15..25).map(|i| format!("turn {i}")).collect();
    assert_eq!(forwarded, expected.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(msgs.last().unwrap(), &Message::user("now"));
}

#[test]
fn messages_short_history_forwarded_whole() {
    let hist = history(3);
    let msgs = build_messages("sys".into(), &hist, "now");
    assert_eq!(msgs.len(), 5);
    assert_eq!(msgs[1].role, "user");
    assert_eq!(msgs[2].role, "assistant");
    assert_eq!(msgs[3].content, "turn 2");
}

// =========================================================================
// translate_response
// =========================================================================

#[test]
fn translate_text_only() {
    let (reply, actions) = translate_response(&test_helpers::text_response("Three staff today.")).unwrap();
    assert_eq!(reply, "Three staff today.");
    assert!(actions.is_empty());
}

#[test]
fn translate_tools_without_text_uses_fallback() {
    let resp = test_helpers::tool_response(
        None,
        &[
            ("navigate_to_view", json!({ "view": "supplies" })),
            ("create_task", json!({ "title": "Reorder gloves", "priority": "high" })),
        ],
    );
    let (reply, actions) = translate_response(&resp).unwrap();
    assert_eq!(reply, FALLBACK_REPLY);
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0].kind, "navigate_to_view");
    assert_eq!(actions[0].data, Some(blob(json!({ "view": "supplies" }))));
    assert_eq!(actions[0].target, None);
    assert_eq!(actions[1].kind, "create_task");
    assert_eq!(actions[1].data.as_ref().unwrap()["priority"], "high");
}

#[test]
fn translate_tools_with_text_keeps_text() {
    let resp = test_helpers::tool_response(Some("Opening supplies."), &[("navigate_to_view", json!({ "view": "supplies" }))]);
    let (reply, actions) = translate_response(&resp).unwrap();
    assert_eq!(reply, "Opening supplies.");
    assert_eq!(actions.len(), 1);
}

#[test]
fn translate_empty_response_is_empty_reply() {
    let resp = test_helpers::tool_response(None, &[]);
    let (reply, actions) = translate_response(&resp).unwrap();
    assert_eq!(reply, "");
    assert!(actions.is_empty());
}

#[test]
fn translate_non_object_arguments_fails_whole_response() {
    let resp = test_helpers::tool_response(Some("text too"), &[("open_chat", json!(["bob"]))]);
    let err = translate_response(&resp).unwrap_err();
    assert!(matches!(err, CopilotError::Processing(msg) if msg.contains("open_chat")));
}

#[test]
fn action_command_serializes_type_and_nulls() {
    let action = ActionCommand { kind: "open_chat".into(), target: None, data: None };
    assert_eq!(serde_json::to_value(&action).unwrap(), json!({ "type": "open_chat", "target": null, "data": null }));
}

// =========================================================================
// suggestions_for_view
// =========================================================================

#[test]
fn suggestions_for_equipment() {
    assert_eq!(
        suggestions_for_view(Some("equipment")),
        vec!["Any equipment needing maintenance?", "Show equipment by status", "What's the most used equipment?"]
    );
}

#[test]
fn suggestions_unknown_view_uses_default() {
    let expected = DEFAULT_SUGGESTIONS.map(String::from).to_vec();
    assert_eq!(suggestions_for_view(Some("foobar")), expected);
    assert_eq!(suggestions_for_view(None), expected);
    assert_eq!(suggestions_for_view(Some("")), expected);
}

#[test]
fn suggestions_every_table_entry_has_three() {
    for (view, _) in SUGGESTIONS_BY_VIEW {
        assert_eq!(suggestions_for_view(Some(*view)).len(), 3, "view {view}");
    }
}

// =========================================================================
// request parsing
// =========================================================================

#[test]
fn request_parses_camel_case_context() {
    let req: ChatRequest = serde_json::from_value(json!({
        "message": "hi",
        "context": {
            "currentView": "calendar",
            "userName": "Dana",
            "staffData": { "onDuty": 4 },
            "roomsData": null,
            "somethingElse": true
        },
        "history": [{ "role": "assistant", "content": "hello" }]
    }))
    .unwrap();
    let ctx = req.context.unwrap();
    assert_eq!(ctx.current_view.as_deref(), Some("calendar"));
    assert_eq!(ctx.user_name.as_deref(), Some("Dana"));
    assert_eq!(ctx.staff_data.unwrap()["onDuty"], 4);
    assert!(ctx.rooms_data.is_none());
    assert_eq!(req.history.unwrap()[0].role, ChatRole::Assistant);
}

#[test]
fn request_minimal_and_null_fields() {
    let req: ChatRequest = serde_json::from_value(json!({ "message": "hi", "context": null, "history": null })).unwrap();
    assert!(req.context.is_none());
    assert!(req.history.is_none());
}

#[test]
fn request_rejects_unknown_role_and_missing_message() {
    assert!(serde_json::from_value::<ChatRequest>(json!({ "message": "hi", "history": [{ "role": "system", "content": "x" }] })).is_err());
    assert!(serde_json::from_value::<ChatRequest>(json!({ "history": [] })).is_err());
}

#[test]
fn request_rejects_non_object_blob() {
    assert!(serde_json::from_value::<ChatRequest>(json!({ "message": "hi", "context": { "tasksData": [1, 2] } })).is_err());
}

// =========================================================================
// handle_chat
// =========================================================================

#[tokio::test]
async fn handle_chat_without_key_makes_no_call() {
    let mock = MockLlm::new(vec![]);
    let state = AppState::new(test_helpers::unconfigured(), Some(mock.clone() as Arc<dyn LlmChat>));
    let err = handle_chat(&state, request("hi")).await.unwrap_err();
    assert!(matches!(err, CopilotError::NotConfigured));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn handle_chat_with_placeholder_key_makes_no_call() {
    let mock = MockLlm::new(vec![]);
    let config = crate::config::CopilotConfig::from_lookup(|key| {
        (key == "OPENAI_API_KEY").then(|| crate::config::PLACEHOLDER_API_KEY.to_string())
    })
    .unwrap();
    let state = AppState::new(config, Some(mock.clone() as Arc<dyn LlmChat>));
    assert!(matches!(handle_chat(&state, request("hi")).await, Err(CopilotError::NotConfigured)));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn handle_chat_without_client_is_not_configured() {
    let state = AppState::new(test_helpers::configured(), None);
    assert!(matches!(handle_chat(&state, request("hi")).await, Err(CopilotError::NotConfigured)));
}

#[tokio::test]
async fn handle_chat_client_build_failure_names_cause() {
    let cause = LlmError::HttpClientBuild("no TLS backend".into()).to_string();
    let state = AppState::new(test_helpers::configured(), None).with_llm_init_error(cause);
    let err = handle_chat(&state, request("hi")).await.unwrap_err();
    assert_eq!(err.error_code(), "E_PROCESSING");
    assert_eq!(
        err.to_string(),
        "AI processing error: LLM client unavailable: HTTP client build failed: no TLS backend"
    );
}

#[tokio::test]
async fn handle_chat_missing_key_wins_over_client_build_failure() {
    let state = AppState::new(test_helpers::unconfigured(), None).with_llm_init_error("boom");
    assert!(matches!(handle_chat(&state, request("hi")).await, Err(CopilotError::NotConfigured)));
}

#[tokio::test]
async fn handle_chat_text_reply() {
    let mock = MockLlm::new(vec![Ok(test_helpers::text_response("Four people are on duty."))]);
    let state = test_helpers::test_app_state_with_llm(mock.clone());
    let mut req = request("Who's working?");
    req.context = Some(AppContext { current_view: Some("equipment".into()), ..AppContext::default() });

    let resp = handle_chat(&state, req).await.unwrap();
    assert_eq!(resp.reply, "Four people are on duty.");
    assert!(resp.actions.is_empty());
    assert_eq!(resp.suggestions[0], "Any equipment needing maintenance?");
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn handle_chat_sends_catalog_options_and_trimmed_history() {
    let mock = MockLlm::new(vec![]);
    let state = test_helpers::test_app_state_with_llm(mock.clone());
    let mut req = request("latest");
    req.history = Some(history(12));

    handle_chat(&state, req).await.unwrap();
    let call = mock.last_call();
    assert_eq!(call.messages.len(), 12);
    assert_eq!(call.messages[0].role, "system");
    assert_eq!(call.messages[1].content, "turn 2");
    assert_eq!(call.messages[10].content, "turn 11");
    assert_eq!(call.messages[11], Message::user("latest"));
    assert_eq!(call.tool_names.len(), 8);
    assert_eq!(call.options, CHAT_OPTIONS);
    assert_eq!(call.options.tool_choice, "auto");
    assert_eq!(call.options.max_tokens, 1000);
}

#[tokio::test]
async fn handle_chat_tool_calls_become_actions() {
    let mock = MockLlm::new(vec![Ok(test_helpers::tool_response(
        None,
        &[
            ("show_alert", json!({ "message": "Autoclave due", "type": "warning" })),
            ("highlight_item", json!({ "itemType": "equipment", "itemName": "Autoclave" })),
        ],
    ))]);
    let state = test_helpers::test_app_state_with_llm(mock);
    let resp = handle_chat(&state, request("anything due?")).await.unwrap();
    assert_eq!(resp.reply, FALLBACK_REPLY);
    let kinds: Vec<&str> = resp.actions.iter().map(|a| a.kind.as_str()).collect();
    assert_eq!(kinds, vec!["show_alert", "highlight_item"]);
    assert_eq!(resp.suggestions, DEFAULT_SUGGESTIONS.map(String::from).to_vec());
}

#[tokio::test]
async fn handle_chat_llm_failure_is_processing_error() {
    let mock = MockLlm::new(vec![Err(LlmError::ApiRequest("connection reset".into()))]);
    let state = test_helpers::test_app_state_with_llm(mock);
    let err = handle_chat(&state, request("hi")).await.unwrap_err();
    assert_eq!(err.error_code(), "E_PROCESSING");
    assert_eq!(err.to_string(), "AI processing error: API request failed: connection reset");
}

#[test]
fn error_messages_and_codes() {
    assert_eq!(CopilotError::NotConfigured.to_string(), "OpenAI API key not configured. Set OPENAI_API_KEY in .env");
    assert_eq!(CopilotError::NotConfigured.error_code(), "E_NOT_CONFIGURED");
    assert_eq!(CopilotError::Processing("x".into()).error_code(), "E_PROCESSING");
}
