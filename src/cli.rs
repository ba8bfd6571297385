//! Command-line interface.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::bridge::Bridge;

#[derive(Parser)]
#[command(name = "tripmate", version, about = "Tool-calling travel assistant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Interactive chat session (default)
    Chat,
    /// Answer a single prompt and exit
    Ask { prompt: String },
    /// Serve the travel tools over stdio (spawned by the bridge)
    ServeTools,
    /// Transcribe an audio file to text
    Transcribe { file: PathBuf },
}

/// What one line of chat input asks for.
#[derive(Debug, PartialEq)]
enum Directive<'a> {
    Quit,
    Clear,
    Skip,
    Say(&'a str),
}

fn classify(line: &str) -> Directive<'_> {
    let input = line.trim();
    if input.is_empty() {
        return Directive::Skip;
    }
    match input.to_lowercase().as_str() {
        "quit" | "exit" | "/quit" | "/exit" => Directive::Quit,
        "/clear" | "clear" => Directive::Clear,
        _ => Directive::Say(input),
    }
}

/// Interactive loop. `quit`/`exit` leaves, `/clear` resets history.
pub async fn run_chat_loop(bridge: &mut Bridge) -> Result<()> {
    println!("Type your message. Type quit or exit to leave, /clear to reset.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = match classify(&line) {
            Directive::Quit => {
                println!("Goodbye!");
                break;
            }
            Directive::Clear => {
                bridge.clear_history();
                println!("[Cleared]");
                continue;
            }
            Directive::Skip => continue,
            Directive::Say(input) => input,
        };

        match bridge.process_message(input).await {
            Ok(reply) => println!("\nAssistant > {}\n", reply),
            Err(e) => println!("\n[Error: {}]\n", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_commands() {
        assert_eq!(classify("quit"), Directive::Quit);
        assert_eq!(classify("  EXIT  "), Directive::Quit);
        assert_eq!(classify("/clear"), Directive::Clear);
        assert_eq!(classify(""), Directive::Skip);
        assert_eq!(classify("   "), Directive::Skip);
        assert_eq!(
            classify(" what is the weather in Beijing "),
            Directive::Say("what is the weather in Beijing")
        );
    }
}
