//! Command implementations for taskwell.
//!
//! Every CLI subcommand and MCP tool ends up here. Commands open the
//! storage for a working directory, do their work and return a result that
//! implements [`Output`]. Commands are organized by entity type:
//! - projects, tasks, subtasks and memories (create / list / update)
//! - `next` - next-task recommendation
//! - `analyze` - complexity analysis (see [`analyze`])
//! - `config` - show and set preferences

pub mod analyze;

pub use analyze::{AnalyzeOutcome, AnalyzeRequest, analyze, create_suggested_subtasks, select_tasks};

use crate::config::{self, ConfigOverrides, Resolved, TaskwellConfig};
use crate::models::complexity::thresholds;
use crate::models::{Memory, Project, Subtask, Task, TaskStatus};
use crate::storage::{
    MEMORY_PREFIX, PROJECT_PREFIX, SUBTASK_PREFIX, Storage, TASK_PREFIX, parse_priority,
    parse_status,
};
use crate::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::Path;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} cannot be empty", field)));
    }
    Ok(())
}

fn validate_complexity(complexity: i32) -> Result<()> {
    if !(thresholds::MIN_SCORE..=thresholds::MAX_SCORE).contains(&complexity) {
        return Err(Error::InvalidInput(format!(
            "complexity must be between {} and {}, got {}",
            thresholds::MIN_SCORE,
            thresholds::MAX_SCORE,
            complexity
        )));
    }
    Ok(())
}

fn validate_hours(hours: f64) -> Result<()> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(Error::InvalidInput(format!(
            "estimatedHours must be a non-negative number, got {}",
            hours
        )));
    }
    Ok(())
}

// === Project Commands ===

#[derive(Serialize)]
pub struct ProjectCreated {
    pub id: String,
    pub name: String,
}

impl Output for ProjectCreated {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        format!("Created project {} \"{}\"", self.id, self.name)
    }
}

/// Create a new project.
pub fn project_create(
    repo_path: &Path,
    name: String,
    description: Option<String>,
) -> Result<ProjectCreated> {
    require_non_empty("Project name", &name)?;
    let mut storage = Storage::open(repo_path)?;

    let id = storage.new_id(PROJECT_PREFIX, &name)?;
    let mut project = Project::new(id.clone(), name.clone());
    project.description = description.unwrap_or_default();
    storage.create_project(&project)?;

    tracing::info!(id = %id, "Created project");
    Ok(ProjectCreated { id, name })
}

#[derive(Serialize)]
pub struct ProjectList {
    pub projects: Vec<Project>,
    pub count: usize,
}

impl Output for ProjectList {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects found.".to_string();
        }

        let mut lines = vec![format!("{} project(s):\n", self.count)];
        for project in &self.projects {
            lines.push(format!("[{}] {}", project.id, project.name));
            if !project.description.is_empty() {
                lines.push(format!("       {}", project.description));
            }
        }
        lines.join("\n")
    }
}

/// List all projects.
pub fn project_list(repo_path: &Path) -> Result<ProjectList> {
    let storage = Storage::open(repo_path)?;
    let projects = storage.list_projects()?;
    let count = projects.len();
    Ok(ProjectList { projects, count })
}

// === Task Commands ===

/// Fields for a new task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub project_id: String,
    pub name: String,
    pub details: Option<String>,
    pub priority: Option<String>,
    pub complexity: Option<i32>,
    pub estimated_hours: Option<f64>,
    pub depends_on: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreated {
    pub id: String,
    pub name: String,
    pub project_id: String,
}

impl Output for TaskCreated {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        format!(
            "Created task {} \"{}\" in project {}",
            self.id, self.name, self.project_id
        )
    }
}

/// Create a new task in an existing project.
pub fn task_create(repo_path: &Path, input: NewTask) -> Result<TaskCreated> {
    require_non_empty("Task name", &input.name)?;
    if let Some(complexity) = input.complexity {
        validate_complexity(complexity)?;
    }
    if let Some(hours) = input.estimated_hours {
        validate_hours(hours)?;
    }
    let priority = input
        .priority
        .as_deref()
        .map(parse_priority)
        .transpose()?
        .unwrap_or_default();

    let mut storage = Storage::open(repo_path)?;
    storage.get_project(&input.project_id)?;

    let id = storage.new_id(TASK_PREFIX, &input.name)?;
    let mut task = Task::new(id.clone(), input.project_id.clone(), input.name.clone());
    task.details = input.details.unwrap_or_default();
    task.priority = priority;
    task.complexity = input.complexity;
    task.estimated_hours = input.estimated_hours;
    task.depends_on = input.depends_on;
    task.tags = input.tags;
    storage.create_task(&task)?;

    tracing::info!(id = %id, project = %input.project_id, "Created task");
    Ok(TaskCreated {
        id,
        name: input.name,
        project_id: input.project_id,
    })
}

#[derive(Serialize)]
pub struct TaskList {
    pub tasks: Vec<Task>,
    pub count: usize,
}

impl Output for TaskList {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        if self.tasks.is_empty() {
            return "No tasks found.".to_string();
        }

        let mut lines = vec![format!("{} task(s):\n", self.count)];
        for task in &self.tasks {
            let complexity = task
                .complexity
                .map(|c| format!(" c{}", c))
                .unwrap_or_default();
            lines.push(format!(
                "[{}] {} {}{} {}",
                task.id, task.priority, task.status, complexity, task.name
            ));
        }
        lines.join("\n")
    }
}

/// List tasks, optionally filtered by project and status.
pub fn task_list(
    repo_path: &Path,
    project_id: Option<&str>,
    status: Option<&str>,
) -> Result<TaskList> {
    let status = status.map(parse_status).transpose()?;
    let storage = Storage::open(repo_path)?;

    let tasks: Vec<Task> = storage
        .list_tasks(project_id)?
        .into_iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .collect();
    let count = tasks.len();
    Ok(TaskList { tasks, count })
}

/// Changes to apply to a task. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub details: Option<String>,
    pub status: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<String>,
    pub complexity: Option<i32>,
    pub estimated_hours: Option<f64>,
    pub depends_on: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdated {
    pub id: String,
    pub updated_fields: Vec<String>,
}

impl Output for TaskUpdated {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        if self.updated_fields.is_empty() {
            format!("Task {} unchanged", self.id)
        } else {
            format!(
                "Updated task {}: {}",
                self.id,
                self.updated_fields.join(", ")
            )
        }
    }
}

/// Update a task's fields.
///
/// Status and the completion flag are kept consistent: `status = done`
/// marks the task completed and `completed = true` sets the status to done.
/// When both are given, `completed` is applied last.
pub fn task_update(repo_path: &Path, id: &str, update: TaskUpdate) -> Result<TaskUpdated> {
    let mut storage = Storage::open(repo_path)?;
    let mut task = storage.get_task(id)?;
    let mut updated_fields = Vec::new();

    if let Some(name) = update.name {
        require_non_empty("Task name", &name)?;
        task.name = name;
        updated_fields.push("name".to_string());
    }
    if let Some(details) = update.details {
        task.details = details;
        updated_fields.push("details".to_string());
    }
    if let Some(status) = update.status {
        task.set_status(parse_status(&status)?);
        updated_fields.push("status".to_string());
    }
    if let Some(completed) = update.completed {
        task.set_completed(completed);
        updated_fields.push("completed".to_string());
    }
    if let Some(priority) = update.priority {
        task.priority = parse_priority(&priority)?;
        updated_fields.push("priority".to_string());
    }
    if let Some(complexity) = update.complexity {
        validate_complexity(complexity)?;
        task.complexity = Some(complexity);
        updated_fields.push("complexity".to_string());
    }
    if let Some(hours) = update.estimated_hours {
        validate_hours(hours)?;
        task.estimated_hours = Some(hours);
        updated_fields.push("estimatedHours".to_string());
    }
    if let Some(depends_on) = update.depends_on {
        if depends_on.iter().any(|dep| dep == id) {
            return Err(Error::InvalidInput(format!(
                "Task {} cannot depend on itself",
                id
            )));
        }
        task.depends_on = depends_on;
        updated_fields.push("dependsOn".to_string());
    }
    if let Some(tags) = update.tags {
        task.tags = tags;
        updated_fields.push("tags".to_string());
    }

    if !updated_fields.is_empty() {
        task.updated_at = Utc::now();
        storage.update_task(&task)?;
        tracing::info!(id = %id, fields = ?updated_fields, "Updated task");
    }

    Ok(TaskUpdated {
        id: id.to_string(),
        updated_fields,
    })
}

// === Subtask Commands ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskCreated {
    pub id: String,
    pub task_id: String,
    pub name: String,
}

impl Output for SubtaskCreated {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        format!(
            "Created subtask {} \"{}\" under task {}",
            self.id, self.name, self.task_id
        )
    }
}

/// Create a subtask under an existing task.
pub fn subtask_create(
    repo_path: &Path,
    task_id: &str,
    name: String,
    details: Option<String>,
) -> Result<SubtaskCreated> {
    require_non_empty("Subtask name", &name)?;
    let mut storage = Storage::open(repo_path)?;
    let task = storage.get_task(task_id)?;

    let id = storage.new_id(SUBTASK_PREFIX, &format!("{}:{}", task_id, name))?;
    let mut subtask = Subtask::new(id.clone(), &task, name.clone());
    subtask.details = details.unwrap_or_default();
    storage.create_subtask(&subtask)?;

    tracing::info!(id = %id, task = %task_id, "Created subtask");
    Ok(SubtaskCreated {
        id,
        task_id: task_id.to_string(),
        name,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskList {
    pub task_id: String,
    pub subtasks: Vec<Subtask>,
    pub count: usize,
}

impl Output for SubtaskList {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        if self.subtasks.is_empty() {
            return format!("No subtasks for task {}.", self.task_id);
        }

        let done = self.subtasks.iter().filter(|s| s.completed).count();
        let mut lines = vec![format!(
            "{} subtask(s) for task {} ({} completed):\n",
            self.count, self.task_id, done
        )];
        for subtask in &self.subtasks {
            let mark = if subtask.completed { "x" } else { " " };
            lines.push(format!("[{}] {} {}", mark, subtask.id, subtask.name));
        }
        lines.join("\n")
    }
}

/// List the subtasks of a task.
pub fn subtask_list(repo_path: &Path, task_id: &str) -> Result<SubtaskList> {
    let storage = Storage::open(repo_path)?;
    storage.get_task(task_id)?;
    let subtasks = storage.list_subtasks(task_id)?;
    let count = subtasks.len();
    Ok(SubtaskList {
        task_id: task_id.to_string(),
        subtasks,
        count,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskUpdated {
    pub id: String,
    pub updated_fields: Vec<String>,
}

impl Output for SubtaskUpdated {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        if self.updated_fields.is_empty() {
            format!("Subtask {} unchanged", self.id)
        } else {
            format!(
                "Updated subtask {}: {}",
                self.id,
                self.updated_fields.join(", ")
            )
        }
    }
}

/// Update a subtask's name, details or completion flag.
pub fn subtask_update(
    repo_path: &Path,
    id: &str,
    name: Option<String>,
    details: Option<String>,
    completed: Option<bool>,
) -> Result<SubtaskUpdated> {
    let mut storage = Storage::open(repo_path)?;
    let mut subtask = storage.get_subtask(id)?;
    let mut updated_fields = Vec::new();

    if let Some(name) = name {
        require_non_empty("Subtask name", &name)?;
        subtask.name = name;
        updated_fields.push("name".to_string());
    }
    if let Some(details) = details {
        subtask.details = details;
        updated_fields.push("details".to_string());
    }
    if let Some(completed) = completed {
        subtask.completed = completed;
        updated_fields.push("completed".to_string());
    }

    if !updated_fields.is_empty() {
        subtask.updated_at = Utc::now();
        storage.update_subtask(&subtask)?;
        tracing::info!(id = %id, fields = ?updated_fields, "Updated subtask");
    }

    Ok(SubtaskUpdated {
        id: id.to_string(),
        updated_fields,
    })
}

// === Memory Commands ===

#[derive(Serialize)]
pub struct MemoryCreated {
    pub id: String,
    pub title: String,
}

impl Output for MemoryCreated {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        format!("Created memory {} \"{}\"", self.id, self.title)
    }
}

/// Store a new memory.
pub fn memory_create(
    repo_path: &Path,
    title: String,
    content: String,
    tags: Vec<String>,
) -> Result<MemoryCreated> {
    require_non_empty("Memory title", &title)?;
    let mut storage = Storage::open(repo_path)?;

    let id = storage.new_id(MEMORY_PREFIX, &title)?;
    let mut memory = Memory::new(id.clone(), title.clone(), content);
    memory.tags = tags;
    storage.create_memory(&memory)?;

    tracing::info!(id = %id, "Created memory");
    Ok(MemoryCreated { id, title })
}

#[derive(Serialize)]
pub struct MemoryList {
    pub memories: Vec<Memory>,
    pub count: usize,
}

impl Output for MemoryList {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        if self.memories.is_empty() {
            return "No memories found.".to_string();
        }

        let mut lines = vec![format!("{} memory(ies):\n", self.count)];
        for memory in &self.memories {
            let tags = if memory.tags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", memory.tags.join(", "))
            };
            lines.push(format!("[{}] {}{}", memory.id, memory.title, tags));
            lines.push(format!("       {}", memory.content));
        }
        lines.join("\n")
    }
}

/// List memories, filtered by tag and/or a case-insensitive text query.
pub fn memory_list(repo_path: &Path, tag: Option<&str>, query: Option<&str>) -> Result<MemoryList> {
    let storage = Storage::open(repo_path)?;
    let memories = storage.list_memories(tag, query)?;
    let count = memories.len();
    Ok(MemoryList { memories, count })
}

// === Next Task ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextTaskRecommendation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    /// Open tasks whose dependencies are all satisfied.
    pub ready_count: usize,
    /// Open tasks still waiting on an unfinished dependency.
    pub waiting_count: usize,
}

impl Output for NextTaskRecommendation {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        match &self.task {
            Some(task) => {
                let complexity = task
                    .complexity
                    .map(|c| format!(", complexity {}", c))
                    .unwrap_or_default();
                let mut out = format!(
                    "Next task: {} \"{}\" (priority {}{})\n",
                    task.id, task.name, task.priority, complexity
                );
                if !task.details.is_empty() {
                    out.push_str(&format!("  {}\n", task.details));
                }
                out.push_str(&format!(
                    "{} task(s) ready, {} waiting on dependencies",
                    self.ready_count, self.waiting_count
                ));
                out
            }
            None if self.waiting_count > 0 => format!(
                "No task is ready: {} open task(s) are waiting on dependencies.",
                self.waiting_count
            ),
            None => "No open tasks. Everything is done.".to_string(),
        }
    }
}

/// Pick the next task to work on.
///
/// Candidates are open tasks (not done, not blocked) whose dependencies are
/// all done. A dependency that no longer exists counts as done. Among
/// candidates the highest priority wins, then the lowest complexity (absent
/// counts as 5), then the oldest task.
pub fn recommend_next(tasks: &[Task], project_id: Option<&str>) -> NextTaskRecommendation {
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();
    let dependency_done = |dep: &String| by_id.get(dep.as_str()).is_none_or(|t| t.is_done());

    let (ready, waiting): (Vec<&Task>, Vec<&Task>) = tasks
        .iter()
        .filter(|t| project_id.is_none_or(|pid| t.project_id == pid))
        .filter(|t| !t.is_done() && t.status != TaskStatus::Blocked)
        .partition(|t| t.depends_on.iter().all(dependency_done));

    let task = ready
        .iter()
        .min_by_key(|t| {
            (
                Reverse(t.priority),
                t.complexity.unwrap_or(thresholds::DEFAULT_COMPLEXITY),
                t.created_at,
            )
        })
        .map(|t| (*t).clone());

    NextTaskRecommendation {
        task,
        ready_count: ready.len(),
        waiting_count: waiting.len(),
    }
}

/// Recommend the next task for a working directory.
pub fn next_task(repo_path: &Path, project_id: Option<&str>) -> Result<NextTaskRecommendation> {
    let storage = Storage::open(repo_path)?;
    let tasks = storage.list_tasks(None)?;
    Ok(recommend_next(&tasks, project_id))
}

// === Analysis ===

/// Caller-facing options for an analysis run. Unset values come from config.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    pub task_id: Option<String>,
    pub project_id: Option<String>,
    pub threshold: Option<i32>,
    pub suggest_breakdown: Option<bool>,
    pub auto_create_subtasks: bool,
}

/// Run complexity analysis for a working directory.
pub fn analyze_complexity(repo_path: &Path, options: AnalyzeOptions) -> Result<AnalyzeOutcome> {
    let mut storage = Storage::open(repo_path)?;

    let mut overrides = ConfigOverrides::new();
    if let Some(threshold) = options.threshold {
        overrides = overrides.with_complexity_threshold(threshold);
    }
    if let Some(suggest) = options.suggest_breakdown {
        overrides = overrides.with_suggest_breakdown(suggest);
    }
    let resolved = config::resolve_config(&storage, &overrides)?;

    let request = AnalyzeRequest {
        task_id: options.task_id,
        project_id: options.project_id,
        threshold: resolved.complexity_threshold(),
        suggest_breakdown: resolved.suggest_breakdown(),
        auto_create_subtasks: options.auto_create_subtasks,
    };
    analyze(&mut storage, &request)
}

// === Config Commands ===

#[derive(Serialize)]
pub struct ResolvedValue {
    pub value: serde_json::Value,
    pub source: String,
}

impl<T: Serialize> From<&Resolved<T>> for ResolvedValue {
    fn from(resolved: &Resolved<T>) -> Self {
        Self {
            value: serde_json::to_value(&resolved.value).unwrap_or_default(),
            source: resolved.source.to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct ConfigShow {
    #[serde(rename = "complexity-threshold")]
    pub complexity_threshold: ResolvedValue,
    #[serde(rename = "suggest-breakdown")]
    pub suggest_breakdown: ResolvedValue,
    #[serde(rename = "log-level")]
    pub log_level: ResolvedValue,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        [
            ("complexity-threshold", &self.complexity_threshold),
            ("suggest-breakdown", &self.suggest_breakdown),
            ("log-level", &self.log_level),
        ]
        .iter()
        .map(|(key, v)| format!("{} = {} ({})", key, v.value, v.source))
        .collect::<Vec<_>>()
        .join("\n")
    }
}

/// Show resolved preferences and where each value came from.
pub fn config_show(repo_path: &Path) -> Result<ConfigShow> {
    let storage = Storage::open(repo_path)?;
    let resolved = config::resolve_config(&storage, &ConfigOverrides::default())?;
    Ok(ConfigShow {
        complexity_threshold: (&resolved.complexity_threshold).into(),
        suggest_breakdown: (&resolved.suggest_breakdown).into(),
        log_level: (&resolved.log_level).into(),
    })
}

#[derive(Serialize)]
pub struct ConfigSet {
    pub key: String,
    pub value: String,
    pub scope: String,
}

impl Output for ConfigSet {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        format!("Set {} = {} ({})", self.key, self.value, self.scope)
    }
}

/// Set a preference at session or system level.
pub fn config_set(repo_path: &Path, key: &str, value: &str, system: bool) -> Result<ConfigSet> {
    let storage = Storage::open(repo_path)?;
    let mut cfg = if system {
        Storage::read_system_config()?
    } else {
        storage.read_config()?
    };

    apply_config_value(&mut cfg, key, value)?;
    cfg.validate().map_err(Error::InvalidInput)?;

    if system {
        Storage::write_system_config(&cfg)?;
    } else {
        storage.write_config(&cfg)?;
    }

    Ok(ConfigSet {
        key: key.to_string(),
        value: value.to_string(),
        scope: if system { "system" } else { "session" }.to_string(),
    })
}

fn apply_config_value(cfg: &mut TaskwellConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "complexity-threshold" => {
            let threshold = value.parse::<i32>().map_err(|_| {
                Error::InvalidInput(format!("complexity-threshold must be an integer, got {}", value))
            })?;
            cfg.complexity_threshold = Some(threshold);
        }
        "suggest-breakdown" => {
            let suggest = match value.to_lowercase().as_str() {
                "true" | "yes" | "1" => true,
                "false" | "no" | "0" => false,
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "suggest-breakdown must be true or false, got {}",
                        value
                    )));
                }
            };
            cfg.suggest_breakdown = Some(suggest);
        }
        "log-level" => {
            cfg.log_level = Some(value.to_lowercase());
        }
        _ => {
            return Err(Error::InvalidInput(format!(
                "Unknown config key: {} (expected complexity-threshold, suggest-breakdown or log-level)",
                key
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::Duration;
    use serial_test::serial;
    use tempfile::TempDir;

    /// Points `TW_DATA_DIR` at a private directory for the lifetime of the guard.
    struct IsolatedEnv {
        repo: TempDir,
        _data: TempDir,
        _config: TempDir,
    }

    impl IsolatedEnv {
        fn new() -> Self {
            let repo = TempDir::new().unwrap();
            let data = TempDir::new().unwrap();
            let config = TempDir::new().unwrap();
            // SAFETY: every test using this guard is #[serial]
            unsafe {
                std::env::set_var(crate::storage::DATA_DIR_ENV, data.path());
                std::env::set_var(crate::storage::CONFIG_DIR_ENV, config.path());
            }
            Self {
                repo,
                _data: data,
                _config: config,
            }
        }

        fn path(&self) -> &Path {
            self.repo.path()
        }
    }

    impl Drop for IsolatedEnv {
        fn drop(&mut self) {
            unsafe {
                std::env::remove_var(crate::storage::DATA_DIR_ENV);
                std::env::remove_var(crate::storage::CONFIG_DIR_ENV);
            }
        }
    }

    fn make_task(id: &str, priority: Priority, complexity: Option<i32>, age_minutes: i64) -> Task {
        let mut task = Task::new(id.to_string(), "tw-p-1".to_string(), id.to_string());
        task.priority = priority;
        task.complexity = complexity;
        task.created_at = Utc::now() - Duration::minutes(age_minutes);
        task
    }

    #[test]
    fn test_recommend_highest_priority_first() {
        let tasks = vec![
            make_task("tw-low", Priority::Low, Some(1), 30),
            make_task("tw-high", Priority::High, Some(9), 10),
            make_task("tw-med", Priority::Medium, Some(2), 20),
        ];
        let next = recommend_next(&tasks, None);
        assert_eq!(next.task.unwrap().id, "tw-high");
        assert_eq!(next.ready_count, 3);
    }

    #[test]
    fn test_recommend_lower_complexity_then_older() {
        let tasks = vec![
            make_task("tw-a", Priority::Medium, Some(6), 50),
            make_task("tw-b", Priority::Medium, None, 10),
            make_task("tw-c", Priority::Medium, Some(5), 40),
        ];
        // tw-b and tw-c both count as complexity 5; tw-c is older
        let next = recommend_next(&tasks, None);
        assert_eq!(next.task.unwrap().id, "tw-c");
    }

    #[test]
    fn test_recommend_skips_unmet_dependencies() {
        let blocker = make_task("tw-dep", Priority::Low, None, 60);
        let mut waiting = make_task("tw-wait", Priority::High, None, 30);
        waiting.depends_on = vec!["tw-dep".to_string()];
        let mut orphan = make_task("tw-orphan", Priority::Medium, None, 20);
        orphan.depends_on = vec!["tw-gone".to_string()];

        let next = recommend_next(&[blocker.clone(), waiting.clone(), orphan.clone()], None);
        assert_eq!(next.task.unwrap().id, "tw-orphan");
        assert_eq!(next.waiting_count, 1);

        let mut done_blocker = blocker;
        done_blocker.set_status(TaskStatus::Done);
        let next = recommend_next(&[done_blocker, waiting, orphan], None);
        assert_eq!(next.task.unwrap().id, "tw-wait");
    }

    #[test]
    fn test_recommend_ignores_done_and_blocked() {
        let mut done = make_task("tw-done", Priority::High, None, 10);
        done.set_completed(true);
        let mut blocked = make_task("tw-blocked", Priority::High, None, 10);
        blocked.set_status(TaskStatus::Blocked);

        let next = recommend_next(&[done, blocked], None);
        assert!(next.task.is_none());
        assert!(next.to_human().contains("Everything is done"));
    }

    #[test]
    fn test_recommend_filters_by_project() {
        let mut other = make_task("tw-other", Priority::High, None, 10);
        other.project_id = "tw-p-2".to_string();
        let mine = make_task("tw-mine", Priority::Low, None, 10);

        let next = recommend_next(&[other, mine], Some("tw-p-1"));
        assert_eq!(next.task.unwrap().id, "tw-mine");
    }

    #[test]
    #[serial]
    fn test_task_lifecycle() {
        let env = IsolatedEnv::new();
        let project = project_create(env.path(), "Website".to_string(), None).unwrap();
        assert!(project.id.starts_with("tw-p-"));

        let created = task_create(
            env.path(),
            NewTask {
                project_id: project.id.clone(),
                name: "Landing page".to_string(),
                priority: Some("high".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        let updated = task_update(
            env.path(),
            &created.id,
            TaskUpdate {
                status: Some("done".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.updated_fields, vec!["status"]);

        let list = task_list(env.path(), Some(&project.id), Some("done")).unwrap();
        assert_eq!(list.count, 1);
        assert!(list.tasks[0].completed);
        assert_eq!(list.tasks[0].priority, Priority::High);
    }

    #[test]
    #[serial]
    fn test_task_create_requires_existing_project() {
        let env = IsolatedEnv::new();
        let result = task_create(
            env.path(),
            NewTask {
                project_id: "tw-p-ffff".to_string(),
                name: "Orphan".to_string(),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    #[serial]
    fn test_task_create_rejects_bad_input() {
        let env = IsolatedEnv::new();
        let project = project_create(env.path(), "P".to_string(), None).unwrap();

        let empty = task_create(
            env.path(),
            NewTask {
                project_id: project.id.clone(),
                name: "  ".to_string(),
                ..Default::default()
            },
        );
        assert!(matches!(empty, Err(Error::InvalidInput(_))));

        let too_complex = task_create(
            env.path(),
            NewTask {
                project_id: project.id,
                name: "Big".to_string(),
                complexity: Some(12),
                ..Default::default()
            },
        );
        assert!(matches!(too_complex, Err(Error::InvalidInput(_))));
    }

    #[test]
    #[serial]
    fn test_subtask_flow() {
        let env = IsolatedEnv::new();
        let project = project_create(env.path(), "P".to_string(), None).unwrap();
        let task = task_create(
            env.path(),
            NewTask {
                project_id: project.id.clone(),
                name: "Parent".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let subtask = subtask_create(env.path(), &task.id, "Step one".to_string(), None).unwrap();
        subtask_update(env.path(), &subtask.id, None, None, Some(true)).unwrap();

        let list = subtask_list(env.path(), &task.id).unwrap();
        assert_eq!(list.count, 1);
        assert!(list.subtasks[0].completed);
        assert_eq!(list.subtasks[0].project_id, project.id);
        assert!(list.to_human().contains("1 completed"));
    }

    #[test]
    #[serial]
    fn test_memory_flow() {
        let env = IsolatedEnv::new();
        memory_create(
            env.path(),
            "Deploy".to_string(),
            "Use the blue cluster".to_string(),
            vec!["ops".to_string()],
        )
        .unwrap();

        assert_eq!(memory_list(env.path(), Some("ops"), None).unwrap().count, 1);
        assert_eq!(memory_list(env.path(), None, Some("BLUE")).unwrap().count, 1);
        assert_eq!(memory_list(env.path(), None, Some("green")).unwrap().count, 0);
    }

    #[test]
    #[serial]
    fn test_analyze_uses_session_threshold() {
        let env = IsolatedEnv::new();
        let project = project_create(env.path(), "P".to_string(), None).unwrap();
        task_create(
            env.path(),
            NewTask {
                project_id: project.id,
                name: "Plain".to_string(),
                ..Default::default()
            },
        )
        .unwrap();

        let outcome = analyze_complexity(env.path(), AnalyzeOptions::default()).unwrap();
        assert_eq!(outcome.threshold, 7);
        assert!(outcome.analysis.unwrap().complex_tasks.is_empty());

        config_set(env.path(), "complexity-threshold", "5", false).unwrap();
        let outcome = analyze_complexity(env.path(), AnalyzeOptions::default()).unwrap();
        assert_eq!(outcome.threshold, 5);
        assert_eq!(outcome.analysis.unwrap().complex_tasks.len(), 1);

        let outcome = analyze_complexity(
            env.path(),
            AnalyzeOptions {
                threshold: Some(9),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(outcome.threshold, 9);
    }

    #[test]
    #[serial]
    fn test_config_set_and_show() {
        let env = IsolatedEnv::new();
        config_set(env.path(), "suggest-breakdown", "false", true).unwrap();
        config_set(env.path(), "log-level", "DEBUG", false).unwrap();

        let shown = config_show(env.path()).unwrap();
        assert_eq!(shown.suggest_breakdown.value, serde_json::json!(false));
        assert_eq!(shown.suggest_breakdown.source, "system");
        assert_eq!(shown.log_level.value, serde_json::json!("debug"));
        assert_eq!(shown.log_level.source, "session");
        assert_eq!(shown.complexity_threshold.source, "default");
    }

    #[test]
    #[serial]
    fn test_config_set_rejects_invalid_values() {
        let env = IsolatedEnv::new();
        assert!(config_set(env.path(), "complexity-threshold", "0", false).is_err());
        assert!(config_set(env.path(), "complexity-threshold", "seven", false).is_err());
        assert!(config_set(env.path(), "log-level", "loud", false).is_err());
        assert!(config_set(env.path(), "editor", "vim", false).is_err());
    }
}
