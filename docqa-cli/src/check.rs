//! Connectivity check against the generation model.

use std::time::Duration;

use docqa_rag::{DEFAULT_GROUNDING_POLICY, Generator, RagError, prompt};
use tracing::{error, info};

use crate::args::Cli;

/// Send `message` to the configured model once and return its reply.
///
/// Reports progress on stdout. Nothing is loaded or indexed.
///
/// # Errors
///
/// - [`RagError::GenerationUnavailable`] if the daemon cannot be reached
/// - [`RagError::GenerationTimeout`] if no reply arrives within `wait`
/// - [`RagError::Generation`] if the daemon rejects the request
pub async fn check(cli: &Cli, message: &str, wait: Duration) -> Result<String, RagError> {
    let generator = cli.checker(wait);
    println!("Sending a test message to {} at {} ...", cli.model, cli.ollama_url);

    let request = prompt::assemble(DEFAULT_GROUNDING_POLICY, &[], message);
    match generator.generate(&request).await {
        Ok(reply) => {
            info!(model = %cli.model, "model check succeeded");
            println!("Response received: {reply}");
            Ok(reply)
        }
        Err(e) => {
            error!(model = %cli.model, error = %e, "model check failed");
            match &e {
                RagError::GenerationUnavailable { .. } => println!(
                    "Ollama is not reachable at {}. Is `ollama serve` running?",
                    cli.ollama_url
                ),
                RagError::GenerationTimeout { timeout } => println!(
                    "No reply from {} within {}s. The model may still be loading.",
                    cli.model,
                    timeout.as_secs()
                ),
                other => println!("Check failed: {other}"),
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn unreachable_daemon_is_reported_as_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}");
        let cli = Cli::try_parse_from(["docqa", "--ollama-url", url.as_str(), "check"]).unwrap();
        let err = check(&cli, "ping", Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, RagError::GenerationUnavailable { .. }), "got {err:?}");
    }
}
