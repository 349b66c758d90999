//! Main chat loop orchestration.
//!
//! Prints the banner, then alternates between reading a line and streaming
//! the assistant's reply for it. Slash commands manage the session.

use std::io::Write;
use std::time::Instant;

use console::style;
use futures_util::StreamExt;
use tracing::{debug, info};

use parley_types::chat::{ChatEvent, SessionId};
use parley_types::llm::MessageRole;

use crate::state::AppState;

use super::banner::{print_welcome_banner, short_id};
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::spinner;

/// How much of each message `/history` shows.
const PREVIEW_CHARS: usize = 80;

/// Run the interactive chat loop.
///
/// Continues `session` when given, otherwise starts a fresh session.
pub async fn run_chat_loop(state: &AppState, session: Option<String>) -> anyhow::Result<()> {
    let relay = &state.relay;
    let mut session_id = match session {
        Some(id) => SessionId::from(id),
        None => relay.create_session(),
    };

    print_welcome_banner(relay.provider_name(), &state.config.model, session_id.as_str());
    info!(session_id = %session_id, "Chat started");

    let (mut chat_input, _writer) = ChatInput::new(&short_id(session_id.as_str()))
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => continue,
            InputEvent::Message(text) if text.is_empty() => continue,
            InputEvent::Message(text) => text,
        };

        if let Some(command) = commands::parse(&text) {
            match command {
                ChatCommand::Help => commands::print_help(),
                ChatCommand::Clear => chat_input.clear(),
                ChatCommand::Exit => break,
                ChatCommand::New => {
                    session_id = relay.create_session();
                    chat_input.set_session(&short_id(session_id.as_str()));
                    println!(
                        "\n  {} {}\n",
                        style("New session").bold(),
                        style(short_id(session_id.as_str())).dim()
                    );
                }
                ChatCommand::History => print_history(state, &session_id),
                ChatCommand::Reset => {
                    relay.clear_session(&session_id);
                    println!("\n  {}\n", style("History cleared.").dim());
                }
                ChatCommand::Unknown(cmd) => {
                    println!(
                        "\n  {} Unknown command: {}. Type /help for a list.\n",
                        style("?").yellow(),
                        cmd
                    );
                }
            }
            continue;
        }

        stream_reply(state, &session_id, text).await;
    }

    println!();
    println!(
        "  {} Session {} kept in memory until the process exits.",
        style("Goodbye.").bold(),
        style(short_id(session_id.as_str())).dim()
    );
    println!();
    Ok(())
}

/// Stream one turn to stdout. Failures are printed, never fatal to the loop.
async fn stream_reply(state: &AppState, session_id: &SessionId, text: String) {
    let started = Instant::now();
    let thinking = spinner("thinking...");
    let mut turn = state.relay.stream_turn(Some(session_id.clone()), text);
    let mut first_chunk = true;

    while let Some(event) = turn.next().await {
        match event {
            ChatEvent::Chunk { content } => {
                if first_chunk {
                    thinking.finish_and_clear();
                    print!("\n  {} ", style("assistant").cyan().bold());
                    first_chunk = false;
                }
                print!("{content}");
                let _ = std::io::stdout().flush();
            }
            ChatEvent::Done { .. } => {
                thinking.finish_and_clear();
                println!();
                println!(
                    "  {}",
                    style(format!("{:.1}s", started.elapsed().as_secs_f64())).dim()
                );
                println!();
                debug!(session_id = %session_id, "Turn committed");
            }
            ChatEvent::Error { error } => {
                thinking.finish_and_clear();
                if !first_chunk {
                    println!();
                }
                println!("\n  {} {}\n", style("Error:").red().bold(), error);
            }
        }
    }
}

fn print_history(state: &AppState, session_id: &SessionId) {
    let history = state.relay.history(session_id).unwrap_or_default();
    println!();
    if history.is_empty() {
        println!("  {}", style("No messages yet.").dim());
        println!();
        return;
    }

    for message in &history {
        let label = match message.role {
            MessageRole::User => style("you").green().bold(),
            MessageRole::Assistant => style("assistant").cyan().bold(),
            MessageRole::System => style("system").dim(),
        };
        println!("  {label} {}", preview(&message.content));
    }
    println!();
}

/// Single-line preview cut on a char boundary.
fn preview(content: &str) -> String {
    let line = content.replace('\n', " ");
    if line.chars().count() <= PREVIEW_CHARS {
        return line;
    }
    let cut: String = line.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}...")
}
