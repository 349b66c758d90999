//! Line editor for the chat loop.
//!
//! The prompt carries the short session id so `/new` is visible at a glance.

use console::style;
use rustyline_async::{Readline, ReadlineError, ReadlineEvent, SharedWriter};

#[derive(Debug)]
pub enum InputEvent {
    /// A submitted line, trimmed. May be empty.
    Message(String),
    /// Ctrl+D or a broken terminal.
    Eof,
    /// Ctrl+C.
    Interrupted,
}

pub struct ChatInput {
    rl: Readline,
}

impl ChatInput {
    /// The returned `SharedWriter` must stay alive while the editor is in use.
    pub fn new(session_label: &str) -> Result<(Self, SharedWriter), ReadlineError> {
        let (rl, writer) = Readline::new(prompt_for(session_label))?;
        Ok((Self { rl }, writer))
    }

    /// Point the prompt at another session.
    pub fn set_session(&mut self, session_label: &str) {
        let _ = self.rl.update_prompt(&prompt_for(session_label));
    }

    pub async fn read_line(&mut self) -> InputEvent {
        let line = match self.rl.readline().await {
            Ok(ReadlineEvent::Line(line)) => line,
            Ok(ReadlineEvent::Interrupted) => return InputEvent::Interrupted,
            Ok(ReadlineEvent::Eof) | Err(_) => return InputEvent::Eof,
        };

        let text = line.trim();
        if !text.is_empty() {
            self.rl.add_history_entry(text.to_string());
        }
        InputEvent::Message(text.to_string())
    }

    pub fn clear(&mut self) {
        let _ = self.rl.clear();
    }
}

fn prompt_for(session_label: &str) -> String {
    format!(
        "{} {} ",
        style(format!("[{session_label}]")).dim(),
        style("you >").green().bold()
    )
}
