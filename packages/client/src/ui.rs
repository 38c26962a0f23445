//! Terminal UI utilities for the client.

use std::io::Write;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use flashcrowd_shared::protocol::Role;

fn prompt(role: Role) -> String {
    format!("{}> ", role)
}

/// Redisplay the prompt after printing a message
pub fn redisplay_prompt(role: Role) {
    print!("{}", prompt(role));
    std::io::stdout().flush().ok();
}

/// Read lines from the terminal on a dedicated thread.
///
/// The channel closes on Ctrl+C / Ctrl+D. One reader serves every reconnect
/// attempt of the process.
pub fn spawn_line_reader(role: Role) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = prompt(role);
        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}
