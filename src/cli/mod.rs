//! CLI argument definitions for taskwell.

use clap::{Parser, Subcommand};

/// Taskwell - project, task and memory tracking for AI agents.
///
/// Run `tw mcp serve` to expose everything as MCP tools, or use the
/// subcommands directly.
#[derive(Parser, Debug)]
#[command(name = "tw")]
#[command(author, version = crate::LONG_VERSION, about = "Project, task and memory tracking for AI agents", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if tw was started in <path> instead of the current directory.
    /// Can also be set via TW_DIR environment variable.
    #[arg(short = 'C', long = "dir", global = true, env = "TW_DIR")]
    pub working_dir: Option<std::path::PathBuf>,

    /// Log level for this run; overrides config files and TW_LOG
    #[arg(long = "log-level", global = true, value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// MCP server commands
    Mcp {
        #[command(subcommand)]
        command: McpCommands,
    },

    /// Score task complexity and suggest breakdowns
    Analyze {
        /// Analyze only this task
        #[arg(long = "task")]
        task_id: Option<String>,

        /// Analyze only this project's tasks
        #[arg(long = "project")]
        project_id: Option<String>,

        /// Score at or above which a task counts as complex (1-10)
        #[arg(long, value_parser = clap::value_parser!(i32).range(1..=10))]
        threshold: Option<i32>,

        /// Do not propose breakdowns
        #[arg(long)]
        no_breakdown: bool,

        /// Create every proposed breakdown as subtasks
        #[arg(long, conflicts_with = "no_breakdown")]
        auto_create: bool,
    },

    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Task management commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Subtask management commands
    Subtask {
        #[command(subcommand)]
        command: SubtaskCommands,
    },

    /// Memory commands (notes kept across sessions)
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },

    /// Recommend the next task to work on
    Next {
        /// Only consider this project's tasks
        #[arg(long = "project")]
        project_id: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// MCP subcommands
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Start stdio MCP server
    Serve,

    /// Output tool definitions as JSON
    Manifest,
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new project
    Create {
        /// Project name
        name: String,

        /// Project description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List projects
    List,
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a new task
    Create {
        /// Task name
        name: String,

        /// Owning project ID
        #[arg(short, long = "project")]
        project_id: String,

        /// Task details
        #[arg(short, long)]
        details: Option<String>,

        /// Priority (low, medium, high)
        #[arg(long)]
        priority: Option<String>,

        /// Complexity estimate (1-10)
        #[arg(long)]
        complexity: Option<i32>,

        /// Estimated effort in hours
        #[arg(long = "hours")]
        estimated_hours: Option<f64>,

        /// Task this one depends on (can be repeated)
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,

        /// Tags (can be specified multiple times)
        #[arg(short, long = "tag")]
        tag: Vec<String>,
    },

    /// List tasks
    List {
        /// Filter by project
        #[arg(long = "project")]
        project_id: Option<String>,

        /// Filter by status (pending, in-progress, blocked, done)
        #[arg(long)]
        status: Option<String>,
    },

    /// Update a task
    Update {
        /// Task ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New details
        #[arg(long)]
        details: Option<String>,

        /// New status (pending, in-progress, blocked, done)
        #[arg(long)]
        status: Option<String>,

        /// Set the completion flag
        #[arg(long)]
        completed: Option<bool>,

        /// New priority (low, medium, high)
        #[arg(long)]
        priority: Option<String>,

        /// New complexity estimate (1-10)
        #[arg(long)]
        complexity: Option<i32>,

        /// New effort estimate in hours
        #[arg(long = "hours")]
        estimated_hours: Option<f64>,
    },
}

/// Subtask subcommands
#[derive(Subcommand, Debug)]
pub enum SubtaskCommands {
    /// Create a subtask under a task
    Create {
        /// Parent task ID
        task_id: String,

        /// Subtask name
        name: String,

        /// Subtask details
        #[arg(short, long)]
        details: Option<String>,
    },

    /// List the subtasks of a task
    List {
        /// Parent task ID
        task_id: String,
    },

    /// Update a subtask
    Update {
        /// Subtask ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New details
        #[arg(long)]
        details: Option<String>,

        /// Set the completion flag
        #[arg(long)]
        completed: Option<bool>,
    },
}

/// Memory subcommands
#[derive(Subcommand, Debug)]
pub enum MemoryCommands {
    /// Store a new memory
    Create {
        /// Short title
        title: String,

        /// Memory content
        content: String,

        /// Tags (can be specified multiple times)
        #[arg(short, long = "tag")]
        tag: Vec<String>,
    },

    /// List memories
    List {
        /// Only memories with this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Case-insensitive text to look for in title or content
        #[arg(short, long)]
        query: Option<String>,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration and where each value comes from
    Show,

    /// Set a configuration value
    Set {
        /// Key (complexity-threshold, suggest-breakdown, log-level)
        key: String,

        /// Value
        value: String,

        /// Write to the system config instead of this directory's config
        #[arg(long)]
        system: bool,
    },
}
