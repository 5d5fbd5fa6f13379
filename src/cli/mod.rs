//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for list/query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
}

pub mod commands;

/// postsync - keep a local post store and a Blogger blog in agreement
#[derive(Parser, Debug)]
#[command(name = "postsync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.postsync/data/postsync.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Actor name for the audit trail
    #[arg(long, global = true, env = "POSTSYNC_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the local post database
    Init {
        /// Overwrite existing database
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Reconcile local posts with the remote blog
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },

    /// Local post management
    Post {
        #[command(subcommand)]
        command: PostCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Sync Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Discover, verify, import and push across every post
    Full,

    /// Re-check linked posts only, without listing the remote
    Light,

    /// Show local sync state (no network)
    Status,
}

// ============================================================================
// Post Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum PostCommands {
    /// Add a local draft
    Add(PostAddArgs),

    /// List local posts
    List(PostListArgs),

    /// Show one post
    Show {
        /// Post ID
        id: String,

        /// Include the audit trail
        #[arg(long)]
        events: bool,
    },

    /// Edit a post and push the edit to its linked remote post
    Edit(PostEditArgs),

    /// Publish a post to the remote blog
    Publish {
        /// Post ID
        id: String,
    },

    /// Take a published post off the remote blog
    Unpublish {
        /// Post ID
        id: String,

        /// Delete the remote post and unlink instead of reverting it to a draft
        #[arg(long)]
        delete: bool,
    },

    /// Move a post between draft and reviewed
    Status {
        /// Post ID
        id: String,

        /// New status (draft, reviewed; synonyms like "approved" work)
        status: String,
    },
}

#[derive(Args, Debug)]
pub struct PostAddArgs {
    /// Post title
    pub title: String,

    /// HTML body
    #[arg(long, default_value = "")]
    pub html: String,

    /// Category, sent to the remote as a label
    #[arg(long, short)]
    pub category: Option<String>,

    /// Article the post was written from
    #[arg(long)]
    pub source_url: Option<String>,
}

#[derive(Args, Debug)]
pub struct PostListArgs {
    /// Filter by status (draft, reviewed, published; synonyms like "live" work)
    #[arg(long, short)]
    pub status: Option<String>,

    /// Only posts linked to a remote post
    #[arg(long, conflicts_with = "unlinked")]
    pub linked: bool,

    /// Only posts without a remote link
    #[arg(long)]
    pub unlinked: bool,

    /// Maximum number of posts
    #[arg(long, short)]
    pub limit: Option<u32>,
}

#[derive(Args, Debug)]
pub struct PostEditArgs {
    /// Post ID
    pub id: String,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New HTML body
    #[arg(long)]
    pub html: Option<String>,
}
