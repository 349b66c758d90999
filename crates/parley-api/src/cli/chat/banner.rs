//! Welcome banner shown when a chat starts.

use console::style;

/// Print provider, model, and session id with a hint about slash commands.
pub fn print_welcome_banner(provider: &str, model: &str, session_id: &str) {
    println!();
    println!("  {}", style("Parley").cyan().bold());
    println!();
    println!("  {}  {}", style("Provider:").bold(), style(provider).dim());
    println!("  {}     {}", style("Model:").bold(), style(model).dim());
    println!("  {}   {}", style("Session:").bold(), style(short_id(session_id)).dim());
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}

/// First eight characters of a session id.
pub fn short_id(session_id: &str) -> String {
    session_id.chars().take(8).collect()
}
