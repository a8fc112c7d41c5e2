//! CLI argument parsing for tasktree.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "tt",
    about = "Hierarchical task tracking with dotted-path ids",
    version,
    after_help = "Logs are written to: ~/.local/share/tasktree/logs/tasktree.log"
)]
pub struct Cli {
    /// Path to the tasktree store directory (default: current directory)
    #[arg(short = 'd', long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new tasktree store in the current directory
    Init,

    /// Create a new task
    Add {
        /// Task title
        title: String,

        /// Create as the last child of this task
        #[arg(short, long)]
        parent: Option<String>,

        /// Create immediately after this sibling
        #[arg(short, long, conflicts_with = "parent")]
        after: Option<String>,

        /// Description
        #[arg(short = 'D', long)]
        description: Option<String>,

        /// Priority (high, medium, low)
        #[arg(short = 'P', long)]
        priority: Option<String>,

        /// Tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },

    /// List tasks
    List {
        /// Filter by status (todo, in-progress, done)
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by readiness (draft, ready, blocked)
        #[arg(short, long)]
        readiness: Option<String>,

        /// Filter by priority (high, medium, low)
        #[arg(short = 'P', long)]
        priority: Option<String>,

        /// Filter by tag (may be repeated)
        #[arg(short, long)]
        tag: Vec<String>,
    },

    /// Show a task by id
    Show {
        /// Task id (dotted path, e.g. 1.2.3)
        id: String,
    },

    /// Update fields of a task
    Update {
        /// Task id
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(short = 'D', long)]
        description: Option<String>,

        /// New status (todo, in-progress, done)
        #[arg(short, long)]
        status: Option<String>,

        /// New readiness (draft, ready, blocked)
        #[arg(short, long)]
        readiness: Option<String>,

        /// New priority (high, medium, low)
        #[arg(short = 'P', long)]
        priority: Option<String>,

        /// Replace tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },

    /// Remove a task and its whole subtree
    Remove {
        /// Task id
        id: String,
    },

    /// Move a task (and its subtree) to a new position
    Move {
        /// Task id
        id: String,

        /// Place directly after this sibling
        #[arg(short, long)]
        after: Option<String>,

        /// Reparent under this task, as its last child
        #[arg(short, long, conflicts_with = "after")]
        under: Option<String>,

        /// Reparent to the top level, as the last root
        #[arg(long, conflicts_with_all = ["after", "under"])]
        root: bool,
    },

    /// Manage dependency edges between tasks
    Dep {
        #[command(subcommand)]
        command: DepCommand,
    },

    /// Read or patch task metadata
    Meta {
        #[command(subcommand)]
        command: MetaCommand,
    },

    /// Search tasks with a natural-language query
    Search {
        /// Free-text query, e.g. "show me all todo tasks"
        query: String,

        /// Explicit status filter, overrides the query
        #[arg(short, long)]
        status: Option<String>,

        /// Explicit readiness filter, overrides the query
        #[arg(short, long)]
        readiness: Option<String>,

        /// Explicit priority filter, overrides the query
        #[arg(short = 'P', long)]
        priority: Option<String>,

        /// Explicit tag filter, overrides the query (may be repeated)
        #[arg(short, long)]
        tag: Vec<String>,
    },

    /// Find tasks with a similar title (duplicate check)
    Similar {
        /// Candidate title
        title: String,

        /// Minimum similarity score in [0, 1]
        #[arg(short = 'T', long, default_value_t = tasktree::DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f64,
    },

    /// Print the task hierarchy as a tree
    Tree,
}

#[derive(Subcommand)]
pub enum DepCommand {
    /// Add a dependency edge
    Add {
        /// Task the edge starts from
        from: String,

        /// Task the edge points to
        to: String,

        /// Edge kind (child, after, sibling)
        #[arg(short, long, default_value = "after")]
        kind: String,
    },

    /// Remove a dependency edge
    Rm {
        /// Task the edge starts from
        from: String,

        /// Task the edge points to
        to: String,

        /// Edge kind (child, after, sibling)
        #[arg(short, long, default_value = "after")]
        kind: String,
    },

    /// List edges touching a task
    List {
        /// Task id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum MetaCommand {
    /// Read a metadata value by dotted path
    Get {
        /// Task id
        id: String,

        /// Dotted path into the metadata object (e.g. build.ci.runs)
        path: String,
    },

    /// Set a metadata value, creating intermediate objects
    Set {
        /// Task id
        id: String,

        /// Dotted path into the metadata object
        path: String,

        /// Value, parsed as JSON, falling back to a plain string
        value: String,
    },

    /// Append a value at a path, promoting scalars to arrays
    Append {
        /// Task id
        id: String,

        /// Dotted path into the metadata object
        path: String,

        /// Value, parsed as JSON, falling back to a plain string
        value: String,
    },

    /// Remove the value at a path
    Remove {
        /// Task id
        id: String,

        /// Dotted path into the metadata object
        path: String,
    },
}
