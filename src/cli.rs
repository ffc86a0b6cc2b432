// CLI module - command-line argument parsing and handlers
//
// Without a subcommand the binary serves the chat API. Subcommands:
// - config --show: Display effective configuration (token redacted)
// - config --path: Print the config file location
// - ask <message>: Send one message upstream and print the answer

use crate::config::{Config, VERSION};
use crate::gateway::{ChatRequest, GatewayClient};
use anyhow::Result;
use clap::{Parser, Subcommand};

/// Wanderpal - chat relay for the travel assistant flow
#[derive(Parser)]
#[command(name = "wanderpal")]
#[command(version = VERSION)]
#[command(about = "Chat relay for the travel assistant flow", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
    /// Send a single message to the travel assistant and print the reply
    Ask {
        /// Message text
        message: String,

        /// Access token for this call (overrides the configured one)
        #[arg(long)]
        token: Option<String>,

        /// Conversation id forwarded upstream
        #[arg(long)]
        session_id: Option<String>,
    },
}

/// Handle CLI commands. Returns true if a command was handled (exit after).
pub async fn handle_cli() -> Result<bool> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { show, path }) => {
            if path {
                handle_config_path();
            } else if show {
                handle_config_show()?;
            } else {
                // No flag provided, show help
                println!("Usage: wanderpal config [--show|--path]");
                println!();
                println!("Options:");
                println!("  --show    Display effective configuration");
                println!("  --path    Show config file path");
            }
            Ok(true)
        }
        Some(Commands::Ask {
            message,
            token,
            session_id,
        }) => {
            handle_ask(message, token, session_id).await?;
            Ok(true)
        }
        None => Ok(false), // No subcommand, serve the API
    }
}

fn handle_config_path() {
    match Config::config_path() {
        Some(path) => println!("{}", path.display()),
        None => {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
    }
}

fn handle_config_show() -> Result<()> {
    let config = Config::from_env()?;

    println!("# Effective configuration (env > file > defaults)");
    println!();
    print!("{}", config.to_toml_redacted());

    // Show source info
    println!();
    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
    Ok(())
}

async fn handle_ask(
    message: String,
    token: Option<String>,
    session_id: Option<String>,
) -> Result<()> {
    let config = Config::from_env()?;
    let client = GatewayClient::from_config(config.upstream)?;

    let request = ChatRequest {
        token,
        session_id,
        ..ChatRequest::new(message)
    };

    match client.run(&request).await {
        Ok(answer) => {
            println!("{answer}");
            Ok(())
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
