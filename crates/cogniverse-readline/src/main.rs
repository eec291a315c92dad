mod command;
mod logging;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use cogniverse_application::{ChatController, Reply};
use cogniverse_core::attachment::format_file_size;
use cogniverse_core::cache::ResponseCache;
use cogniverse_core::completion::CompletionClient;
use cogniverse_core::session::{ChatSummary, Message, MessageKind, Sender};
use cogniverse_core::storage::ChatStorage;
use cogniverse_infrastructure::{CogniversePaths, ConfigStorage, FileStore, SecretStorage};
use cogniverse_interaction::{DemoClient, OpenAiApiClient};

use crate::command::{COMMANDS, Command};

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<&'static str>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|(name, _)| *name).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.to_string(),
                    replacement: cmd.to_string(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// REPL state beyond the controller.
struct Repl {
    chat: ChatController,
    api: Option<OpenAiApiClient>,
    streaming: bool,
}

/// The main entry point for the Cogniverse readline REPL.
///
/// Resolves paths, installs file logging, loads `config.toml` and the API
/// key (falling back to demo mode without one), then runs the chat loop.
#[tokio::main]
async fn main() -> Result<()> {
    // ===== Configuration =====
    let paths = CogniversePaths::resolve().context("Could not locate the cogniverse directory")?;
    paths
        .ensure_dirs()
        .with_context(|| format!("Could not create {}", paths.root().display()))?;

    let _log_guard = logging::init(&paths.logs_dir());

    let config_storage = ConfigStorage::new(paths.config_file());
    config_storage.ensure_default()?;
    let config = config_storage.load()?;

    let secret_storage = SecretStorage::new(paths.secret_file());
    secret_storage.ensure_template()?;
    let secrets = secret_storage.resolve();

    // ===== Backend Initialization =====
    let (client, api): (Arc<dyn CompletionClient>, Option<OpenAiApiClient>) =
        match secrets.api_key() {
            Some(key) => {
                let api = OpenAiApiClient::new(key, config.completion.clone())?;
                tracing::info!(
                    target: "cogniverse",
                    "Using {} at {}",
                    config.completion.model,
                    config.completion.base_url
                );
                (Arc::new(api.clone()), Some(api))
            }
            None => {
                tracing::warn!(target: "cogniverse", "API key not configured. Using demo mode.");
                (Arc::new(DemoClient::new()), None)
            }
        };

    let storage = ChatStorage::new(Arc::new(FileStore::new(paths.storage_dir())));
    let chat = ChatController::open(storage, client)
        .with_cache(ResponseCache::new(config.cache.capacity))
        .with_context_builder(config.context_builder());

    let mut repl = Repl {
        chat,
        api,
        streaming: false,
    };

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== Cogniverse ===".bright_magenta().bold());
    if repl.api.is_none() {
        println!(
            "{}",
            format!(
                "Demo mode: add an api_key to {} or set COGNIVERSE_API_KEY.",
                paths.secret_file().display()
            )
            .yellow()
        );
    }
    println!("{}", "Type a message, '/help' for commands, or '/quit' to exit.".bright_black());
    println!();
    print_transcript(&repl.chat);

    // ===== Main REPL Loop =====
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match Command::parse(trimmed) {
                    Ok(Command::Quit) => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Ok(command) => {
                        if let Err(e) = repl.run(command).await {
                            tracing::warn!(target: "cogniverse", "Command failed: {}", e);
                            eprintln!("{}", format!("Error: {e}").red());
                        }
                    }
                    Err(message) => eprintln!("{}", message.yellow()),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    repl.chat.flush();
    Ok(())
}

impl Repl {
    async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Send(text) => {
                let reply = if self.streaming {
                    let reply = self
                        .chat
                        .send_message_streaming(&text, |fragment| {
                            print!("{}", fragment.bright_blue());
                            let _ = std::io::stdout().flush();
                        })
                        .await?;
                    println!();
                    if reply.is_failure() {
                        print_reply(&reply);
                    }
                    reply
                } else {
                    let reply = self.chat.send_message(&text).await?;
                    print_reply(&reply);
                    reply
                };
                tracing::debug!(target: "cogniverse", "Reply source: {:?}", reply.source);
            }
            Command::New => {
                let id = self.chat.new_chat();
                println!("{}", format!("Started chat {id}").green());
            }
            Command::Chats => print_library(&self.chat.library()),
            Command::Open(id) => {
                self.chat.open_chat(id)?;
                print_transcript(&self.chat);
            }
            Command::Search(term) => print_library(&self.chat.search(&term)),
            Command::Export { format, id } => {
                let exported = self.chat.export(id, format)?;
                std::fs::write(&exported.file_name, &exported.content)
                    .with_context(|| format!("Could not write {}", exported.file_name))?;
                println!(
                    "{}",
                    format!("Exported to {} ({})", exported.file_name, exported.mime_type).green()
                );
            }
            Command::Import(path) => {
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("Could not read {}", path.display()))?;
                let ids = self.chat.import(&json)?;
                println!("{}", format!("Imported {} chat(s)", ids.len()).green());
            }
            Command::Attach(path) => {
                let attachment = self.chat.attach_file(&path)?;
                println!(
                    "{}",
                    format!(
                        "Attached {} ({})",
                        attachment.file_name,
                        format_file_size(attachment.size())
                    )
                    .green()
                );
            }
            Command::Analyze { path, prompt } => {
                println!("{}", "Analyzing file...".bright_black());
                let reply = self.chat.analyze_file(&path, prompt.as_deref()).await?;
                print_reply(&reply);
            }
            Command::Audio(path) => {
                let recording = read_recording(&path)?;
                self.chat.attach_audio(&recording);
                println!(
                    "{}",
                    format!("Voice message saved ({})", format_file_size(recording.len() as u64))
                        .green()
                );
            }
            Command::Stats => {
                let stats = self.chat.stats();
                println!("{}", "Conversation statistics".bright_magenta());
                println!("  chats:            {}", stats.total_chats);
                println!("  messages:         {}", stats.total_messages);
                println!("  from you:         {}", stats.user_messages);
                println!("  from Cogniverse:  {}", stats.bot_messages);
                println!("  average per chat: {:.1}", stats.average_messages_per_chat);
            }
            Command::Clear => {
                self.chat.clear_all();
                println!("{}", "All chat history has been cleared.".green());
            }
            Command::Theme(theme) => {
                let theme = match theme {
                    Some(theme) => {
                        self.chat.set_theme(theme);
                        theme
                    }
                    None => self.chat.toggle_theme(),
                };
                println!("{}", format!("Theme: {theme}").green());
            }
            Command::Font(size) => {
                self.chat.set_font_size(size);
                println!("{}", format!("Font size: {size}").green());
            }
            Command::AutoScroll(on) => {
                self.chat.set_auto_scroll(on);
                println!("{}", format!("Auto-scroll: {}", if on { "on" } else { "off" }).green());
            }
            Command::Stream => {
                self.streaming = !self.streaming;
                let state = if self.streaming { "on" } else { "off" };
                println!("{}", format!("Streaming: {state}").green());
            }
            Command::Usage => match &self.api {
                Some(api) => match api.usage().await {
                    Some(usage) => println!("{usage:#}"),
                    None => println!("{}", "Usage information is unavailable.".yellow()),
                },
                None => println!("{}", "No API key configured (demo mode).".yellow()),
            },
            Command::Test => match &self.api {
                Some(api) => {
                    println!("{}", "Testing API connection...".bright_black());
                    if api.test_connection().await {
                        println!("{}", "API connection OK".green());
                    } else {
                        println!("{}", "API connection failed; see the log for details.".red());
                    }
                }
                None => println!("{}", "No API key configured (demo mode).".yellow()),
            },
            Command::Help => {
                for (name, usage) in COMMANDS {
                    println!("  {} {}", name.bright_cyan(), usage.bright_black());
                }
            }
            Command::Quit => {}
        }
        Ok(())
    }
}

fn read_recording(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Could not read {}", path.display()))
}

fn print_reply(reply: &Reply) {
    let text = reply.content.as_str();
    for line in text.lines() {
        if reply.is_failure() {
            println!("{}", line.red());
        } else {
            println!("{}", line.bright_blue());
        }
    }
}

fn print_message(message: &Message) {
    let body = match message.kind {
        MessageKind::Text => message.content.clone(),
        MessageKind::File => format!(
            "[file] {}",
            message.file_name.as_deref().unwrap_or("attachment")
        ),
        MessageKind::Audio => "[voice message]".to_string(),
    };
    match message.sender {
        Sender::User => println!("{}", format!("> {body}").green()),
        Sender::Bot => {
            for line in body.lines() {
                println!("{}", line.bright_blue());
            }
        }
    }
}

fn print_transcript(chat: &ChatController) {
    println!("{}", format!("--- {} ---", chat.current_title()).bright_magenta());
    for message in chat.current_messages() {
        print_message(message);
    }
}

fn print_library(rows: &[ChatSummary]) {
    if rows.is_empty() {
        println!("{}", "No chats found.".bright_black());
        return;
    }
    for row in rows {
        let title = if row.message_count == 0 {
            "New Chat".to_string()
        } else {
            row.title.clone()
        };
        let started = row
            .started_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "  {}  {}  {}",
            row.id.to_string().bright_cyan(),
            title,
            started.bright_black()
        );
    }
}
