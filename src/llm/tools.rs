//! Copilot action catalog.
//!
//! Each tool is an action the dental app knows how to execute client-side.
//! The relay never runs them; it forwards the model's calls as
//! `ActionCommand`s.

use super::types::Tool;

/// Views the app can navigate to.
pub const VIEWS: &[&str] = &[
    "calendar",
    "schedule",
    "duties",
    "task-hub",
    "requests",
    "projects",
    "sticky-notes",
    "equipment",
    "instruments",
    "supplies",
    "vendors",
    "procedures",
];

/// Settings/management panels the app can open.
pub const SETTINGS_PANELS: &[&str] = &[
    "manage-users",
    "manage-roles",
    "manage-clinics",
    "manage-rooms",
    "manage-schedule",
    "manage-tasks",
    "manage-duties",
    "manage-permissions",
    "master-settings",
];

/// Build the eight callable actions offered to the model on every request.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn copilot_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "navigate_to_view".into(),
            description: "Navigate the user to a specific view/page in the dental app".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "view": { "type": "string", "enum": VIEWS, "description": "The view to navigate to" }
                },
                "required": ["view"]
            }),
        },
        Tool {
            name: "open_settings_panel".into(),
            description: "Open a settings/management panel in the app".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "panel": { "type": "string", "enum": SETTINGS_PANELS, "description": "The settings panel to open" }
                },
                "required": ["panel"]
            }),
        },
        Tool {
            name: "create_task".into(),
            description: "Create a new task and optionally assign it to an employee".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string", "description": "Task title" },
                    "description": { "type": "string", "description": "Task description" },
                    "assignee": { "type": "string", "description": "Employee username to assign to" },
                    "priority": { "type": "string", "enum": ["low", "medium", "high", "urgent"] },
                    "dueDate": { "type": "string", "description": "Due date in YYYY-MM-DD format" }
                },
                "required": ["title"]
            }),
        },
        Tool {
            name: "highlight_item".into(),
            description: "Highlight or focus attention on a specific item in the current view".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "itemType": {
                        "type": "string",
                        "enum": ["equipment", "instrument", "supply", "vendor", "task", "user"],
                        "description": "The type of item to highlight"
                    },
                    "itemName": { "type": "string", "description": "Name/identifier of the item" }
                },
                "required": ["itemType", "itemName"]
            }),
        },
        Tool {
            name: "show_alert".into(),
            description: "Show a notification/alert to the user in the app".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "message": { "type": "string", "description": "Alert message to display" },
                    "type": { "type": "string", "enum": ["info", "success", "warning", "error"] }
                },
                "required": ["message", "type"]
            }),
        },
        Tool {
            name: "generate_report".into(),
            description: "Generate a summary report for the user".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "reportType": {
                        "type": "string",
                        "enum": ["daily_schedule", "inventory_summary", "task_summary", "staff_overview", "low_stock_alert"],
                        "description": "Type of report to generate"
                    }
                },
                "required": ["reportType"]
            }),
        },
        Tool {
            name: "create_sticky_note".into(),
            description: "Create a new sticky note on the sticky notes board".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string", "description": "The text content of the sticky note" },
                    "color": {
                        "type": "string",
                        "enum": ["yellow", "pink", "blue", "green", "purple", "orange"],
                        "description": "Color of the sticky note"
                    }
                },
                "required": ["text"]
            }),
        },
        Tool {
            name: "open_chat".into(),
            description: "Open the Team Chat modal, optionally starting a direct message conversation with a specific user"
                .into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "username": {
                        "type": "string",
                        "description": "The username of the person to chat with. If omitted, just opens the chat modal."
                    },
                    "message": { "type": "string", "description": "Optional message to pre-fill in the chat input" }
                },
                "required": []
            }),
        },
    ]
}

#[cfg(test)]
#[path = "tools_test.rs"]
mod tests;
