use amie_core::{AgentConfig, AgentFactory, EventBus, Session, ToolRegistry};
use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod render;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Only log to stderr so it never mixes with the conversation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    info!("Starting Amie CLI");

    let config = AgentConfig::from_env()?;
    let client = AgentFactory::create_from_config(&config)?;
    let registry = Arc::new(ToolRegistry::with_builtin_tools());

    // Create event bus for communication
    let event_bus = EventBus::new();
    let mut session = Session::from_config(&config, client, registry, event_bus.sender());

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(render::run_printer(event_bus.into_receiver(), done_tx));

    let info = session.agent_info();
    println!("Welcome to Amie! ({} / {})", info.name, info.model);
    println!("Type 'q' or 'quit' to exit, '/clear' to start over.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "q" | "quit" => break,
            "/clear" => {
                session.clear();
                println!("Conversation cleared.");
            }
            _ => {
                // Failures are reported through the event bus
                let _ = session.handle_user_input(input.to_string()).await;
                done_rx.recv().await;
            }
        }
    }

    drop(session);
    let _ = printer.await;

    info!("Amie CLI shutting down");
    Ok(())
}
