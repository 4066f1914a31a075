//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "groundwork")]
#[command(
    author,
    version,
    about = "Index a document corpus and chat with answers grounded on it"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to <config dir>/groundwork/config.yaml)
    #[arg(long, global = true, env = "GROUNDWORK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Document root, overriding the config
    #[arg(long, global = true)]
    pub docs_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show which documents are indexed, unindexed, modified or missing
    Status,

    /// Index new and changed documents
    Reindex(ReindexArgs),

    /// Print the retrieved context for a query
    Context(ContextArgs),

    /// Ask a question grounded on the corpus
    Chat(ChatArgs),

    /// Check the generation backend and vector store
    Health,

    /// List corpus documents
    Ls,

    /// Print a document
    Show(ShowArgs),

    /// Overwrite an existing document
    Save(SaveArgs),
}

#[derive(Args)]
pub struct ReindexArgs {
    /// Relative paths to reindex regardless of change state
    pub targets: Vec<String>,
}

#[derive(Args)]
pub struct ContextArgs {
    /// Query text
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Number of passages (defaults to retrieval.top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,
}

#[derive(Args)]
pub struct ChatArgs {
    /// Message; reads one message per line from stdin when omitted
    pub message: Vec<String>,

    /// Conversation id
    #[arg(long, default_value = "default")]
    pub session: String,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Path relative to the document root
    pub path: String,
}

#[derive(Args)]
pub struct SaveArgs {
    /// Path relative to the document root
    pub path: String,

    /// Read the new content from this file instead of stdin
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Reindex the document after saving
    #[arg(long)]
    pub reindex: bool,
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
