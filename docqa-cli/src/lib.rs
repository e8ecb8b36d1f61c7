//! # docqa-cli
//!
//! Command-line front end for [`docqa_rag`]: argument parsing and the
//! interactive console behind the `docqa` binary.

pub mod args;
pub mod check;
pub mod console;

pub use args::{Cli, Command};
pub use check::check;
pub use console::{Console, ConsoleCommand, Flow};
