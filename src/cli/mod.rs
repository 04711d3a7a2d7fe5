//! CLI module for VIA
//!
//! Provides command-line interface parsing and handling for the `via` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod ingest;
pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// VIA - Virtual Insurance Assistant
///
/// Answers questions about your insurance policies from your own documents,
/// failing over between answer providers when one becomes unavailable.
#[derive(Parser, Debug)]
#[command(
    name = "via",
    version,
    about = "VIA - Virtual Insurance Assistant",
    long_about = "Answers questions about insurance policies from your own documents.\n\n\
                  Ingest policy text with 'ingest', then ask with 'ask' or 'chat'.",
    after_help = "EXAMPLES:\n    \
                  via init                          # Write a via.toml template\n    \
                  via ingest policies/              # Index every .txt file in a directory\n    \
                  via ask \"What is my deductible?\"  # Answer one question\n    \
                  via chat                          # Interactive session\n    \
                  via providers                     # Show the failover chain"
)]
pub struct Cli {
    /// Path to the configuration file (defaults to via.toml when present)
    #[arg(short, long, global = true, env = "VIA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a commented via.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files without prompting
        #[arg(short, long)]
        force: bool,
    },

    /// Ingest .txt documents (files or directories) into the index
    ///
    /// Form feeds (\x0C) in a file separate pages.
    Ingest {
        /// Files or directories to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Answer a single question
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Interactive question-and-answer session
    Chat,

    /// Show index statistics
    Index,

    /// List answer providers and their state
    Providers,

    /// Show configuration information
    Config {
        /// Only validate the configuration file
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_joins_words() {
        let cli = Cli::try_parse_from(["via", "ask", "what", "is", "covered?"]).unwrap();
        match cli.command {
            Commands::Ask { question } => assert_eq!(question.join(" "), "what is covered?"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli =
            Cli::try_parse_from(["via", "index", "--config", "other.toml", "--no-color"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("other.toml")));
        assert!(cli.no_color);
    }

    #[test]
    fn test_ingest_requires_paths() {
        assert!(Cli::try_parse_from(["via", "ingest"]).is_err());
    }
}
