use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Debug, Parser)]
#[command(
    name = "qalite",
    about = "A question/answer notebook with exact and semantic search"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the embedding model ID or local model path
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage QA documents in the file store
    Notes {
        #[command(subcommand)]
        action: NotesAction,
    },
    /// Exact-text search across all documents
    Search(SearchArgs),
    /// Semantic search over the index
    Query(QueryArgs),
    /// Import a document's records into the semantic index
    Import(ImportArgs),
    /// Export indexed entries of one source back to a markdown file
    Export(ExportArgs),
    /// Manage semantic index entries
    Entries {
        #[command(subcommand)]
        action: EntriesAction,
    },
    /// List the source tags present in the index
    Sources,
    /// Show store and index statistics
    Status(StatusArgs),
    /// Start MCP server for AI agent integration
    Mcp,
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Notes subcommands --

#[derive(Debug, Subcommand)]
pub enum NotesAction {
    /// List all documents
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a document's raw content
    Show {
        /// Document name
        name: String,
        /// Output parsed records as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Create an empty document
    Create {
        /// Document name
        name: String,
    },
    /// Delete a document
    Delete {
        /// Document name
        name: String,
    },
    /// Append a question/answer pair (creates the document if absent)
    Add {
        /// Document name
        name: String,
        /// Question text
        question: String,
        /// Answer text
        answer: String,
    },
    /// Remove the record at a zero-based index
    RemoveRecord {
        /// Document name
        name: String,
        /// Zero-based record index
        index: i64,
    },
}

// -- Entries subcommands --

#[derive(Debug, Subcommand)]
pub enum EntriesAction {
    /// Page through indexed entries
    List {
        /// Restrict to one source tag
        #[arg(short = 's', long)]
        source: Option<String>,
        /// Page number (from 1)
        #[arg(long, default_value = "1")]
        page: usize,
        /// Entries per page (max 100)
        #[arg(long, default_value = "10")]
        page_size: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add one entry directly to the index
    Add {
        /// Question text
        question: String,
        /// Answer text
        answer: String,
        /// Source tag
        #[arg(short = 's', long, default_value = "manual")]
        source: String,
    },
    /// Delete an entry by id
    Delete {
        /// Entry id
        id: String,
    },
    /// Update an entry's question and/or answer
    Update {
        /// Entry id
        id: String,
        /// New question
        #[arg(long)]
        question: Option<String>,
        /// New answer
        #[arg(long)]
        answer: Option<String>,
        /// Apply without showing the preview
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query
    pub query: String,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Query --

#[derive(Debug, Parser)]
pub struct QueryArgs {
    /// The query text
    pub query: String,

    /// Restrict to entries with this source tag
    #[arg(short = 's', long)]
    pub source: Option<String>,

    /// Number of results to return (max 10)
    #[arg(short = 'n', long, default_value = "3")]
    pub top_k: usize,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Import --

#[derive(Debug, Parser)]
pub struct ImportArgs {
    /// Document name to import
    pub name: String,

    /// Skip pairs already imported under the same source tag
    #[arg(long)]
    pub upsert: bool,
}

// -- Export --

#[derive(Debug, Parser)]
pub struct ExportArgs {
    /// Source tag to export
    pub source: String,

    /// Output file path (default <source>.md)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "qalite",
            &mut std::io::stdout(),
        );
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn parse_query_defaults() {
        let cli = Cli::parse_from(["qalite", "query", "hello"]);
        match cli.command {
            Command::Query(args) => {
                assert_eq!(args.query, "hello");
                assert_eq!(args.top_k, 3);
                assert!(args.source.is_none());
                assert!(!args.json);
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn parse_notes_add() {
        let cli = Cli::parse_from(["qalite", "notes", "add", "rust", "Q", "A"]);
        match cli.command {
            Command::Notes {
                action: NotesAction::Add {
                    name,
                    question,
                    answer,
                },
            } => {
                assert_eq!(name, "rust");
                assert_eq!(question, "Q");
                assert_eq!(answer, "A");
            }
            _ => panic!("expected notes add command"),
        }
    }

    #[test]
    fn parse_entries_update_flags() {
        let cli = Cli::parse_from([
            "qalite", "entries", "update", "some-id", "--question", "new Q",
            "--yes",
        ]);
        match cli.command {
            Command::Entries {
                action: EntriesAction::Update {
                    id,
                    question,
                    answer,
                    yes,
                },
            } => {
                assert_eq!(id, "some-id");
                assert_eq!(question.as_deref(), Some("new Q"));
                assert!(answer.is_none());
                assert!(yes);
            }
            _ => panic!("expected entries update command"),
        }
    }
}
