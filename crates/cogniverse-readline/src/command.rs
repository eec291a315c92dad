//! Slash-command parsing for the REPL.

use cogniverse_core::export::ExportFormat;
use cogniverse_core::session::SessionId;
use cogniverse_core::settings::{FontSize, Theme};
use std::path::PathBuf;

/// Every slash command, for completion and `/help`.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/new", "start a new chat"),
    ("/chats", "list saved chats"),
    ("/open", "<id> switch to a saved chat"),
    ("/search", "[term] find chats containing a term"),
    ("/export", "[txt|json|html] [id] write a chat to the current directory"),
    ("/import", "<file> import chats from a JSON export"),
    ("/attach", "<file> attach a file to the chat"),
    ("/analyze", "<file> [prompt] attach a file and ask about it"),
    ("/audio", "<file> attach a voice recording"),
    ("/stats", "show conversation statistics"),
    ("/clear", "delete all chat history"),
    ("/theme", "[light|dark] toggle or set the theme"),
    ("/font", "<small|medium|large> set the font size"),
    ("/autoscroll", "<on|off> set auto-scroll"),
    ("/stream", "toggle streamed replies"),
    ("/usage", "show API key usage"),
    ("/test", "test the API connection"),
    ("/help", "show this help"),
    ("/quit", "exit"),
];

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text to send to the assistant.
    Send(String),
    New,
    Chats,
    Open(SessionId),
    Search(String),
    Export {
        format: ExportFormat,
        id: Option<SessionId>,
    },
    Import(PathBuf),
    Attach(PathBuf),
    Analyze {
        path: PathBuf,
        prompt: Option<String>,
    },
    Audio(PathBuf),
    Stats,
    Clear,
    Theme(Option<Theme>),
    Font(FontSize),
    AutoScroll(bool),
    Stream,
    Usage,
    Test,
    Help,
    Quit,
}

impl Command {
    /// Parses a trimmed, non-empty input line.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if !line.starts_with('/') {
            return Ok(Command::Send(line.to_string()));
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name {
            "/new" => Command::New,
            "/chats" | "/library" => Command::Chats,
            "/open" => Command::Open(
                rest.parse()
                    .map_err(|_| format!("'{rest}' is not a chat id"))?,
            ),
            "/search" => Command::Search(rest.to_string()),
            "/export" => parse_export(rest)?,
            "/import" => Command::Import(required_path(rest, "/import")?),
            "/attach" => Command::Attach(required_path(rest, "/attach")?),
            "/analyze" => {
                let (path, prompt) = match rest.split_once(char::is_whitespace) {
                    Some((path, prompt)) => (path, Some(prompt.trim().to_string())),
                    None => (rest, None),
                };
                Command::Analyze {
                    path: required_path(path, "/analyze")?,
                    prompt: prompt.filter(|p| !p.is_empty()),
                }
            }
            "/audio" => Command::Audio(required_path(rest, "/audio")?),
            "/stats" => Command::Stats,
            "/clear" => Command::Clear,
            "/theme" if rest.is_empty() => Command::Theme(None),
            "/theme" => Command::Theme(Some(
                rest.parse()
                    .map_err(|_| format!("Unknown theme '{rest}' (light, dark)"))?,
            )),
            "/font" => Command::Font(
                rest.parse()
                    .map_err(|_| format!("Unknown font size '{rest}' (small, medium, large)"))?,
            ),
            "/autoscroll" => Command::AutoScroll(parse_switch(rest)?),
            "/stream" => Command::Stream,
            "/usage" => Command::Usage,
            "/test" => Command::Test,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            other => return Err(format!("Unknown command '{other}'. Type /help.")),
        };
        Ok(command)
    }
}

fn required_path(arg: &str, command: &str) -> Result<PathBuf, String> {
    if arg.is_empty() {
        Err(format!("{command} needs a file path"))
    } else {
        Ok(PathBuf::from(arg))
    }
}

fn parse_export(rest: &str) -> Result<Command, String> {
    let mut args = rest.split_whitespace();
    let format = match args.next() {
        Some(f) => f
            .parse()
            .map_err(|_| format!("Unknown export format '{f}' (txt, json, html)"))?,
        None => ExportFormat::Json,
    };
    let id = match args.next() {
        Some(id) => Some(id.parse().map_err(|_| format!("'{id}' is not a chat id"))?),
        None => None,
    };
    Ok(Command::Export { format, id })
}

fn parse_switch(arg: &str) -> Result<bool, String> {
    match arg {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(format!("Expected on or off, got '{other}'")),
    }
}
