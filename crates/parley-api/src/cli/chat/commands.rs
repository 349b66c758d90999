//! Slash commands understood by `parley chat`.

use console::style;

#[derive(Debug, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    /// Clear the terminal, not the session.
    Clear,
    Exit,
    /// Switch to a fresh session.
    New,
    History,
    /// Forget this session's history but keep its id.
    Reset,
    Unknown(String),
}

/// Name, aliases, and help line for every command, in help order.
const COMMANDS: &[(&str, &[&str], &str)] = &[
    ("help", &["h", "?"], "Show this list"),
    ("clear", &["cls"], "Clear the screen"),
    ("new", &[], "Start a new session"),
    ("history", &[], "Show this session's messages"),
    ("reset", &[], "Forget this session's history"),
    ("exit", &["quit", "q"], "Leave the chat"),
];

/// `None` when the line is ordinary chat text.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let word = input.split_whitespace().next()?;
    let name = word.strip_prefix('/')?.to_lowercase();

    let canonical = COMMANDS
        .iter()
        .find(|(cmd, aliases, _)| *cmd == name || aliases.contains(&name.as_str()))
        .map(|(cmd, _, _)| *cmd);

    Some(match canonical {
        Some("help") => ChatCommand::Help,
        Some("clear") => ChatCommand::Clear,
        Some("new") => ChatCommand::New,
        Some("history") => ChatCommand::History,
        Some("reset") => ChatCommand::Reset,
        Some("exit") => ChatCommand::Exit,
        _ => ChatCommand::Unknown(word.to_string()),
    })
}

pub fn print_help() {
    println!();
    for (cmd, aliases, help) in COMMANDS {
        let names = std::iter::once(*cmd)
            .chain(aliases.iter().copied())
            .map(|n| format!("/{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {:<22} {}", style(names).cyan(), help);
    }
    println!();
    println!("  {}", style("Ctrl+D also exits.").dim());
    println!();
}
