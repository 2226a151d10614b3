//! CLI entry point for storefront-chat

mod client;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use storefront_chat_core::config::{Config, ConfigLoader};
use storefront_chat_core::logging::init_logging;
use storefront_chat_core::utils::{mask_secret, truncate};
use storefront_chat_server::{run_server, AppState};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use client::ApiClient;

#[derive(Parser)]
#[command(name = "storefront-chat")]
#[command(about = "Conversational assistant backend for the Fashion Store")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Port to listen on (overrides configuration)
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
        port: Option<u16>,
    },
    /// Send a message to a running server
    Chat {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Session id for conversation continuity
        #[arg(short, long)]
        session: Option<String>,
        /// API base URL
        #[arg(long)]
        url: Option<String>,
    },
    /// Show the stored history of a session
    History {
        #[arg(short, long)]
        session: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// Clear the stored history of a session
    Clear {
        #[arg(short, long)]
        session: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// Query the server health report
    Health {
        #[arg(long)]
        url: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command {
        Commands::Serve { port } => run_serve(&config_loader, port).await?,
        Commands::Chat {
            message,
            session,
            url,
        } => {
            let session = session.unwrap_or_else(new_session_id);
            run_chat(ApiClient::new(url), &session, &message).await?;
        }
        Commands::History { session, url } => run_history(ApiClient::new(url), &session).await?,
        Commands::Clear { session, url } => {
            let message = ApiClient::new(url).clear(&session).await?;
            println!("{} {}", style("✓").green().bold(), message);
        }
        Commands::Health { url } => {
            let report = ApiClient::new(url).health().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Config => run_config(&config_loader)?,
    }

    Ok(())
}

fn new_session_id() -> String {
    format!("session_{}", uuid::Uuid::new_v4().simple())
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

async fn run_serve(loader: &ConfigLoader, port: Option<u16>) -> Result<()> {
    let mut config = loader.load()?;
    if let Some(port) = port {
        config.server.port = port;
    }

    config.logging.dir = expand_tilde(&config.logging.dir)
        .to_string_lossy()
        .into_owned();
    let _guard = init_logging(&config.logging);

    println!("{}", style("Starting storefront-chat server...").bold().cyan());
    println!("Model: {}", config.completion.model);
    println!("Storage: {}", config.storage.backend.as_str());

    if !config.completion.is_configured() {
        warn!("OPENAI_API_KEY is not set; /api/chat will answer 500 until it is configured");
    }
    if !config.storage.is_configured() {
        warn!("SUPABASE_URL / SUPABASE_ANON_KEY are not set; conversation endpoints will answer 500");
    }

    info!(host = %config.server.host, port = config.server.port, "Starting server");
    let state = AppState::from_config(&config);
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let server_config = config.server.clone();
    let mut server_handle =
        tokio::spawn(async move { run_server(state, &server_config, shutdown_rx).await });

    println!(
        "\n{}",
        style("Server is running. Press Ctrl+C to stop.").green()
    );

    // The server task only finishes first when binding or serving failed
    let finished = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            None
        }
        joined = &mut server_handle => Some(joined),
    };

    let joined = match finished {
        Some(joined) => joined,
        None => {
            println!("\n{}", style("Shutting down...").yellow());
            let _ = shutdown_tx.send(());
            server_handle.await
        }
    };

    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("Server error: {}", e);
            return Err(e);
        }
        Err(e) => anyhow::bail!("Server task failed: {}", e),
    }

    println!("{}", style("Server stopped.").green());
    Ok(())
}

async fn run_chat(client: ApiClient, session: &str, message: &str) -> Result<()> {
    println!("{}", style("Processing...").cyan());
    let reply = client.chat(session, message).await?;

    println!("\n{}", style("Response:").bold());
    println!("{}", reply.response);
    println!(
        "\n{} {} ({} messages stored)",
        style("Session:").dim(),
        session,
        reply.conversation.len()
    );
    Ok(())
}

async fn run_history(client: ApiClient, session: &str) -> Result<()> {
    let history = client.history(session).await?;

    println!("{}", style(format!("Conversation {}", session)).bold().cyan());
    if history.is_empty() {
        println!("  {}", style("(empty)").dim());
        return Ok(());
    }

    for entry in history {
        let role = match entry.role.as_str() {
            "user" => style(entry.role.clone()).green(),
            "assistant" => style(entry.role.clone()).cyan(),
            _ => style(entry.role.clone()).dim(),
        };
        let when = entry.timestamp.as_deref().unwrap_or("");
        println!("  [{}] {}: {}", style(when).dim(), role, truncate(&entry.content, 200));
    }
    Ok(())
}

fn run_config(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;
    print_config(loader, &config);
    Ok(())
}

fn print_config(loader: &ConfigLoader, config: &Config) {
    let status = |configured: bool| {
        if configured {
            style("configured").green()
        } else {
            style("not configured").red()
        }
    };

    println!("{}", style("Storefront Chat Configuration").bold().cyan());
    println!("  Config directory: {}", loader.config_dir().display());
    println!();

    println!("{}", style("Server:").bold());
    println!("  Address: {}:{}", config.server.host, config.server.port);
    println!(
        "  Static dir: {}",
        config.server.static_dir.as_deref().unwrap_or("<none>")
    );
    println!();

    println!("{}", style("Completion:").bold());
    println!("  Status: {}", status(config.completion.is_configured()));
    println!("  API base: {}", config.completion.api_base);
    println!("  API key: {}", mask_secret(&config.completion.api_key));
    println!("  Model: {}", config.completion.model);
    println!("  Max tokens: {}", config.completion.max_tokens);
    println!("  Temperature: {}", config.completion.temperature);
    println!();

    println!("{}", style("Storage:").bold());
    println!("  Backend: {}", config.storage.backend.as_str());
    println!("  Status: {}", status(config.storage.is_configured()));
    let url = if config.storage.url.is_empty() {
        "<not set>"
    } else {
        config.storage.url.as_str()
    };
    println!("  URL: {}", url);
    println!("  API key: {}", mask_secret(&config.storage.api_key));
    println!("  Table: {}", config.storage.table);
    println!();

    println!("{}", style("Chat:").bold());
    println!("  Max messages: {}", config.chat.max_messages);
    println!(
        "  System prompt: {}",
        truncate(config.chat.system_prompt.trim(), 80)
    );
}
