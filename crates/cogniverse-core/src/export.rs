//! Chat export (text, JSON, HTML) and JSON import.

use crate::error::{CogniverseError, Result};
use crate::session::{ChatHistory, Message, SessionId, SessionStore};
use chrono::{DateTime, Utc};
use minijinja::{Environment, context};
use serde::Serialize;
use strum::{Display, EnumString};

const HTML_TEMPLATE_NAME: &str = "chat_export.html";
const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Cogniverse Chat Export</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; background: #f5f5f5; }
        .chat { max-width: 800px; margin: 0 auto; }
        .message { margin: 10px 0; padding: 15px; border-radius: 12px; }
        .user { background: #007BFF; color: white; margin-left: 20%; }
        .bot { background: white; border: 1px solid #ddd; margin-right: 20%; }
        .timestamp { font-size: 12px; opacity: 0.7; margin-top: 5px; }
    </style>
</head>
<body>
    <div class="chat">
        <h1>Cogniverse Chat Export</h1>
{%- for msg in messages %}
        <div class="message {{ msg.css_class }}">
            <strong>{{ msg.sender }}:</strong> {{ msg.content }}
{%- if msg.timestamp %}
            <div class="timestamp">{{ msg.timestamp }}</div>
{%- endif %}
        </div>
{%- endfor %}
    </div>
</body>
</html>
"#;

/// Serialization target of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum ExportFormat {
    #[strum(to_string = "text", serialize = "txt")]
    Text,
    #[strum(to_string = "json")]
    Json,
    #[strum(to_string = "html", serialize = "htm")]
    Html,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain",
            ExportFormat::Json => "application/json",
            ExportFormat::Html => "text/html",
        }
    }
}

/// A serialized session ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedChat {
    pub file_name: String,
    pub mime_type: &'static str,
    pub content: String,
}

/// Serializes one session. Deterministic for a given message list.
pub fn export_session(
    id: SessionId,
    messages: &[Message],
    format: ExportFormat,
) -> Result<ExportedChat> {
    let content = match format {
        ExportFormat::Text => render_text(messages),
        ExportFormat::Json => render_json(id, messages)?,
        ExportFormat::Html => render_html(messages)?,
    };

    Ok(ExportedChat {
        file_name: format!("cogniverse-chat-{id}.{}", format.extension()),
        mime_type: format.mime_type(),
        content,
    })
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn render_text(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| match &m.timestamp {
            Some(ts) => format!("{}: {} ({})", m.sender, m.content, format_timestamp(ts)),
            None => format!("{}: {}", m.sender, m.content),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_json(id: SessionId, messages: &[Message]) -> Result<String> {
    let mut single = ChatHistory::new();
    single.insert(id, messages.to_vec());
    Ok(serde_json::to_string_pretty(&single)?)
}

#[derive(Serialize)]
struct HtmlRow<'a> {
    css_class: String,
    sender: String,
    content: &'a str,
    timestamp: Option<String>,
}

fn render_html(messages: &[Message]) -> Result<String> {
    let mut env = Environment::new();
    env.add_template(HTML_TEMPLATE_NAME, HTML_TEMPLATE)?;
    let template = env.get_template(HTML_TEMPLATE_NAME)?;

    let rows: Vec<HtmlRow<'_>> = messages
        .iter()
        .map(|m| HtmlRow {
            css_class: m.sender.to_string().to_lowercase(),
            sender: m.sender.to_string(),
            content: &m.content,
            timestamp: m.timestamp.as_ref().map(format_timestamp),
        })
        .collect();

    Ok(template.render(context! { messages => rows })?)
}

/// Parsed import payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportPayload {
    /// A session mapping, as persisted or exported as JSON.
    Sessions(ChatHistory),
    /// A bare message list from an older export.
    Messages(Vec<Message>),
}

/// Parses import JSON without touching any state.
pub fn parse_import(json: &str) -> Result<ImportPayload> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| CogniverseError::format(format!("Import file is not valid JSON: {e}")))?;

    match value {
        serde_json::Value::Object(_) => serde_json::from_value(value)
            .map(ImportPayload::Sessions)
            .map_err(|e| CogniverseError::format(format!("Invalid chat history: {e}"))),
        serde_json::Value::Array(_) => serde_json::from_value(value)
            .map(ImportPayload::Messages)
            .map_err(|e| CogniverseError::format(format!("Invalid message list: {e}"))),
        other => Err(CogniverseError::format(format!(
            "Expected a chat history object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Merges imported sessions into `store`, overwriting colliding ids.
///
/// Returns the ids that were written. Nothing is modified when the payload
/// fails to parse.
pub fn import_all(store: &mut SessionStore, json: &str) -> Result<Vec<SessionId>> {
    match parse_import(json)? {
        ImportPayload::Sessions(history) => {
            let ids: Vec<SessionId> = history.ids().collect();
            store.merge(history);
            tracing::info!("Imported {} chat session(s)", ids.len());
            Ok(ids)
        }
        ImportPayload::Messages(messages) => {
            let id = store.insert_new(messages);
            tracing::info!("Imported message list as chat {}", id);
            Ok(vec![id])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Sender;
    use crate::storage::{ChatStorage, MemoryStore};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn empty_store() -> SessionStore {
        SessionStore::load(ChatStorage::new(Arc::new(MemoryStore::new())))
    }

    fn conversation() -> Vec<Message> {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        vec![
            Message::user("Hi <there>").with_timestamp(Some(ts)),
            Message::bot("Hello! & welcome").with_timestamp(None),
            Message::file("data:text/plain;base64,aGk=", "notes.txt").with_timestamp(Some(ts)),
        ]
    }

    #[test]
    fn text_export_lists_sender_content_and_time() {
        let out = export_session(SessionId(12), &conversation(), ExportFormat::Text).unwrap();
        assert_eq!(out.file_name, "cogniverse-chat-12.txt");
        assert_eq!(out.mime_type, "text/plain");
        let blocks: Vec<&str> = out.content.split("\n\n").collect();
        assert_eq!(blocks[0], "User: Hi <there> (2024-05-01 09:30:00 UTC)");
        assert_eq!(blocks[1], "Bot: Hello! & welcome");
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn html_export_escapes_content() {
        let out = export_session(SessionId(12), &conversation(), ExportFormat::Html).unwrap();
        assert_eq!(out.mime_type, "text/html");
        assert!(out.content.contains("<h1>Cogniverse Chat Export</h1>"));
        assert!(out.content.contains("Hi &lt;there&gt;"));
        assert!(out.content.contains("Hello! &amp; welcome"));
        assert!(out.content.contains(r#"class="message user""#));
        assert!(out.content.contains(r#"class="message bot""#));
        assert!(out.content.contains("2024-05-01 09:30:00 UTC"));
    }

    #[test]
    fn export_is_deterministic() {
        let a = export_session(SessionId(1), &conversation(), ExportFormat::Html).unwrap();
        let b = export_session(SessionId(1), &conversation(), ExportFormat::Html).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn json_export_round_trips_through_import() {
        let id = SessionId(1_714_555_800_000);
        let messages = conversation();
        let exported = export_session(id, &messages, ExportFormat::Json).unwrap();

        let mut store = empty_store();
        let ids = import_all(&mut store, &exported.content).unwrap();

        assert_eq!(ids, vec![id]);
        assert_eq!(store.get(id).unwrap(), messages.as_slice());
    }

    #[test]
    fn import_overwrites_colliding_ids() {
        let mut store = empty_store();
        store.append(SessionId(5), Message::user("old"));
        store.append(SessionId(6), Message::user("untouched"));

        import_all(
            &mut store,
            r#"{"5": [{"sender": "Bot", "message": "new", "type": "text"}]}"#,
        )
        .unwrap();

        let replaced = store.get(SessionId(5)).unwrap();
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced[0].sender, Sender::Bot);
        assert_eq!(store.get(SessionId(6)).unwrap()[0].content, "untouched");
    }

    #[test]
    fn bare_message_list_gets_a_new_session() {
        let mut store = empty_store();
        let ids = import_all(
            &mut store,
            r#"[{"sender": "User", "message": "legacy", "type": "text", "fileName": ""}]"#,
        )
        .unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.get(ids[0]).unwrap()[0].content, "legacy");
    }

    #[test]
    fn unparsable_import_is_a_format_error() {
        let mut store = empty_store();
        for payload in ["not json", "42", r#"{"x": "not a list"}"#, r#"[{"bogus": 1}]"#] {
            let err = import_all(&mut store, payload).unwrap_err();
            assert!(err.is_format(), "{payload} -> {err:?}");
        }
        assert!(store.history().is_empty());
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert_eq!("text".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert_eq!("html".parse::<ExportFormat>().unwrap(), ExportFormat::Html);
        assert_eq!(ExportFormat::Json.to_string(), "json");
    }
}
