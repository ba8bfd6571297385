mod bridge;
mod cli;
mod config;
mod connection;
mod error;
mod host;
mod llm;
mod protocol;
mod tools;
mod transcribe;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bridge::Bridge;
use cli::{Cli, Command};
use config::AppConfig;
use connection::ToolConnection;
use llm::openai_compatible::OpenAiCompatibleProvider;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs to stderr: in serve-tools mode stdout carries protocol frames.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tripmate=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Auto-generate config file on first run
    let config_path = AppConfig::config_path()?;
    if !config_path.exists() {
        let path = AppConfig::save_default()?;
        eprintln!("[Config] Created default config: {}", path.display());
        eprintln!("[Config] Edit it to set your api keys, model, etc.");
    }
    let config = AppConfig::load()?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::ServeTools => {
            let router = tools::create_default_router(&config.tools)?;
            host::serve(router).await
        }
        Command::Chat => {
            let mut bridge = open_bridge(&config).await?;
            let outcome = cli::run_chat_loop(&mut bridge).await;
            bridge.shutdown().await;
            outcome
        }
        Command::Ask { prompt } => {
            let mut bridge = open_bridge(&config).await?;
            let outcome = bridge.process_message(&prompt).await;
            bridge.shutdown().await;
            println!("{}", outcome?);
            Ok(())
        }
        Command::Transcribe { file } => {
            let api_key = config.llm_api_key()?;
            let text = transcribe::audio_to_text(&file, &config.llm, &api_key).await?;
            println!("{}", text);
            Ok(())
        }
    }
}

/// Build the model client, spawn the tool host, and assemble the bridge.
async fn open_bridge(config: &AppConfig) -> Result<Bridge> {
    let api_key = config.llm_api_key()?;
    let provider = Box::new(OpenAiCompatibleProvider::new(
        api_key,
        config.llm.base_url.clone(),
    ));

    let connection = ToolConnection::open(&config.host)
        .await
        .context("Failed to open tool connection")?;

    Ok(Bridge::new(provider, Box::new(connection), config))
}
