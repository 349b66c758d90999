//! Interactive terminal chat.
//!
//! Streams each reply through the same `ChatRelay` the HTTP server uses.
//! Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// A steady-ticking spinner with `msg`.
pub fn spinner(msg: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("  {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.set_message(msg);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}
