//! Taskwell CLI - project, task and memory tracking for AI agents.

use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use taskwell::cli::{
    Cli, Commands, ConfigCommands, McpCommands, MemoryCommands, ProjectCommands, SubtaskCommands,
    TaskCommands,
};
use taskwell::commands::{self, AnalyzeOptions, NewTask, Output, TaskUpdate};
use taskwell::config::{self, ConfigOverrides, TaskwellConfig};
use taskwell::{logging, mcp};

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    // Working directory: -C flag > TW_DIR env > current directory
    let repo_path = resolve_working_dir(cli.working_dir, human);

    init_logging(&repo_path, cli.log_level);

    if let Err(e) = run_command(cli.command, &repo_path, human) {
        tracing::debug!(error = %e, "Command failed");
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Resolve the working directory from an explicit path or the current directory.
fn resolve_working_dir(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.exists() {
                let message = format!("Specified directory does not exist: {}", path.display());
                if human {
                    eprintln!("Error: {}", message);
                } else {
                    eprintln!("{}", serde_json::json!({ "error": message }));
                }
                process::exit(1);
            }
            path
        }
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Set up tracing from the resolved log level.
///
/// Only reads config; nothing is created on disk if storage does not exist yet.
fn init_logging(repo_path: &Path, log_level: Option<String>) {
    let mut overrides = ConfigOverrides::default();
    if let Some(level) = log_level {
        overrides = overrides.with_log_level(level);
    }
    let resolved = taskwell::storage::get_storage_dir(repo_path)
        .ok()
        .filter(|root| root.exists())
        .and_then(|_| taskwell::storage::Storage::open(repo_path).ok())
        .and_then(|storage| config::resolve_config(&storage, &overrides).ok())
        .or_else(|| config::resolve_system_config(&overrides).ok())
        .unwrap_or_else(|| {
            let empty = TaskwellConfig::default();
            config::resolve_layers(&empty, &empty, &overrides)
        });
    logging::init_logging(&resolved.log_level);
}

fn run_command(command: Commands, repo_path: &Path, human: bool) -> Result<(), taskwell::Error> {
    match command {
        Commands::Mcp { command } => match command {
            McpCommands::Serve => mcp::serve()?,
            McpCommands::Manifest => mcp::manifest()?,
        },

        Commands::Analyze {
            task_id,
            project_id,
            threshold,
            no_breakdown,
            auto_create,
        } => {
            let options = AnalyzeOptions {
                task_id,
                project_id,
                threshold,
                suggest_breakdown: if no_breakdown { Some(false) } else { None },
                auto_create_subtasks: auto_create,
            };
            let result = commands::analyze_complexity(repo_path, options)?;
            output(&result, human);
        }

        Commands::Project { command } => match command {
            ProjectCommands::Create { name, description } => {
                let result = commands::project_create(repo_path, name, description)?;
                output(&result, human);
            }
            ProjectCommands::List => {
                let result = commands::project_list(repo_path)?;
                output(&result, human);
            }
        },

        Commands::Task { command } => match command {
            TaskCommands::Create {
                name,
                project_id,
                details,
                priority,
                complexity,
                estimated_hours,
                depends_on,
                tag,
            } => {
                let input = NewTask {
                    project_id,
                    name,
                    details,
                    priority,
                    complexity,
                    estimated_hours,
                    depends_on,
                    tags: tag,
                };
                let result = commands::task_create(repo_path, input)?;
                output(&result, human);
            }
            TaskCommands::List { project_id, status } => {
                let result =
                    commands::task_list(repo_path, project_id.as_deref(), status.as_deref())?;
                output(&result, human);
            }
            TaskCommands::Update {
                id,
                name,
                details,
                status,
                completed,
                priority,
                complexity,
                estimated_hours,
            } => {
                let update = TaskUpdate {
                    name,
                    details,
                    status,
                    completed,
                    priority,
                    complexity,
                    estimated_hours,
                    ..Default::default()
                };
                let result = commands::task_update(repo_path, &id, update)?;
                output(&result, human);
            }
        },

        Commands::Subtask { command } => match command {
            SubtaskCommands::Create {
                task_id,
                name,
                details,
            } => {
                let result = commands::subtask_create(repo_path, &task_id, name, details)?;
                output(&result, human);
            }
            SubtaskCommands::List { task_id } => {
                let result = commands::subtask_list(repo_path, &task_id)?;
                output(&result, human);
            }
            SubtaskCommands::Update {
                id,
                name,
                details,
                completed,
            } => {
                let result = commands::subtask_update(repo_path, &id, name, details, completed)?;
                output(&result, human);
            }
        },

        Commands::Memory { command } => match command {
            MemoryCommands::Create {
                title,
                content,
                tag,
            } => {
                let result = commands::memory_create(repo_path, title, content, tag)?;
                output(&result, human);
            }
            MemoryCommands::List { tag, query } => {
                let result = commands::memory_list(repo_path, tag.as_deref(), query.as_deref())?;
                output(&result, human);
            }
        },

        Commands::Next { project_id } => {
            let result = commands::next_task(repo_path, project_id.as_deref())?;
            output(&result, human);
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let result = commands::config_show(repo_path)?;
                output(&result, human);
            }
            ConfigCommands::Set { key, value, system } => {
                let result = commands::config_set(repo_path, &key, &value, system)?;
                output(&result, human);
            }
        },
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
