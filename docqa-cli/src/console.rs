//! Interactive console.

use std::sync::Arc;

use anyhow::Result;
use docqa_rag::{Answer, RagError, Role, Session};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, error};

use crate::args::Cli;

const HELP: &str = "\
Commands:
  /reload    load the documents and rebuild the index
  /history   show the conversation so far
  /state     show the index state
  /help      show this message
  /quit, q   exit
Anything else is asked as a question.";

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Rebuild the index from the data directory.
    Reload,
    /// Print the conversation so far.
    History,
    /// Print the index lifecycle state.
    State,
    /// Print the command list.
    Help,
    /// Leave the console.
    Quit,
    /// Ask the line as a question.
    Ask(String),
    /// A blank line.
    Empty,
}

impl ConsoleCommand {
    /// Classify one line of input; anything that is not a command is a question.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "" => Self::Empty,
            "/reload" | "/load" => Self::Reload,
            "/history" => Self::History,
            "/state" => Self::State,
            "/help" | "?" => Self::Help,
            "/quit" | "/exit" | "quit" | "exit" | "q" => Self::Quit,
            question => Self::Ask(question.to_string()),
        }
    }
}

/// Whether the console keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Stop reading and return.
    Exit,
}

/// Console state: the CLI options and the session they drive.
pub struct Console {
    cli: Cli,
    session: Arc<Session>,
}

impl Console {
    /// Create a console driving `session` with the options in `cli`.
    pub fn new(cli: Cli, session: Arc<Session>) -> Self {
        Self { cli, session }
    }

    /// Rebuild the index with a pipeline constructed from the current options.
    ///
    /// Failures are reported and the console carries on with whatever index it had.
    pub async fn reload(&self) {
        let pipeline = match self.cli.pipeline() {
            Ok(pipeline) => pipeline,
            Err(e) => {
                error!(error = %e, "invalid configuration");
                println!("Configuration error: {e:#}");
                return;
            }
        };

        println!("Loading documents from {} ...", self.cli.data_dir.display());
        match self.session.reload(pipeline).await {
            Ok(report) => println!(
                "Index ready: {} document(s), {} chunk(s), {} skipped.",
                report.loaded, report.chunk_count, report.skipped
            ),
            Err(RagError::BuildInProgress) => {
                println!("A reload is already running; queries use the previous index.")
            }
            Err(e) => println!("Reload failed: {e}"),
        }
    }

    /// Ask one question and print the answer or the failure notice.
    pub async fn ask(&self, question: &str) -> Result<(), RagError> {
        match self.session.ask(question).await {
            Ok(answer) => {
                self.print_answer(&answer);
                Ok(())
            }
            Err(e) if e.is_not_ready() => {
                println!("Please load data first (/reload)");
                Err(e)
            }
            Err(e) => {
                println!("Error: {e}");
                Err(e)
            }
        }
    }

    /// Run one parsed command.
    pub async fn execute(&self, command: ConsoleCommand) -> Flow {
        match command {
            ConsoleCommand::Empty => {}
            ConsoleCommand::Quit => return Flow::Exit,
            ConsoleCommand::Help => println!("{HELP}"),
            ConsoleCommand::State => println!("Index: {}", self.session.state().await),
            ConsoleCommand::Reload => self.reload().await,
            ConsoleCommand::History => self.print_history().await,
            ConsoleCommand::Ask(question) => {
                // Per-question failures were already reported.
                let _ = self.ask(&question).await;
            }
        }
        Flow::Continue
    }

    /// Read commands until `/quit`, end of input, or Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        let mut editor = DefaultEditor::new()?;
        println!("docqa: ask questions about {} (/help for commands)", self.cli.data_dir.display());

        loop {
            let line = match editor.readline("docqa> ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    error!(error = %e, "failed to read input");
                    return Err(e.into());
                }
            };

            let command = ConsoleCommand::parse(&line);
            if command != ConsoleCommand::Empty {
                let _ = editor.add_history_entry(line.as_str());
            }
            debug!(?command, "console command");
            if self.execute(command).await == Flow::Exit {
                break;
            }
        }
        Ok(())
    }

    fn print_answer(&self, answer: &Answer) {
        println!("{}", answer.text);
        if self.cli.show_sources {
            for (rank, source) in answer.sources.iter().enumerate() {
                let file = source
                    .chunk
                    .metadata
                    .get("file_path")
                    .map(String::as_str)
                    .unwrap_or(source.chunk.document_id.as_str());
                println!("  [{}] {:.3} {} ({})", rank + 1, source.score, file, source.chunk.id);
            }
        }
    }

    async fn print_history(&self) {
        let history = self.session.history().await;
        if history.is_empty() {
            println!("No conversation yet.");
            return;
        }
        for turn in history {
            let who = match turn.role {
                Role::User => "you",
                Role::Assistant if turn.failed => "error",
                Role::Assistant => "docqa",
            };
            println!("[{}] {who}: {}", turn.timestamp.format("%H:%M:%S"), turn.text);
        }
    }
}
