use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use docqa_cli::{Cli, Command, Console, check};
use docqa_rag::Session;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so answers on stdout stay clean.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docqa=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let session = Arc::new(Session::new(cli.loader()));
    let console = Console::new(cli.clone(), session);

    match &cli.command {
        Some(Command::Ask { question }) => {
            console.reload().await;
            console.ask(question).await?;
        }
        Some(Command::Check { prompt, wait_secs }) => {
            if cli.offline {
                println!("Offline mode uses no model service; nothing to check.");
            } else {
                check(&cli, prompt, Duration::from_secs(*wait_secs)).await?;
            }
        }
        None => {
            if !cli.no_load {
                console.reload().await;
            }
            console.run().await?;
        }
    }
    Ok(())
}
