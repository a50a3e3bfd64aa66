//! Data models for taskwell records.
//!
//! This module defines the core data structures:
//! - `Project` - Top-level container for tasks
//! - `Task` - Work items with status, priority, complexity and dependencies
//! - `Subtask` - Checklist items owned by a task
//! - `Memory` - Free-form notes an agent wants to keep across sessions
//! - `CreateTaskInput` - Transient payload describing a task that could be created

pub mod complexity;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status in the workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Blocked,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task priority. Ordered so that `High > Medium > Low`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A project grouping related tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier (e.g., "tw-p-a1b2")
    pub id: String,

    /// Project name
    pub name: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project with the given ID and name.
    pub fn new(id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            description: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A work item tracked by taskwell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier (e.g., "tw-a1b2")
    pub id: String,

    /// Task name
    pub name: String,

    /// Detailed description
    #[serde(default)]
    pub details: String,

    /// Owning project
    pub project_id: String,

    /// Current status
    #[serde(default)]
    pub status: TaskStatus,

    /// Completion flag, kept alongside `status` for clients that only read one of them
    #[serde(default)]
    pub completed: bool,

    /// Priority level
    #[serde(default)]
    pub priority: Priority,

    /// Stored complexity estimate (nominally 1-10)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<i32>,

    /// Estimated effort in hours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,

    /// Task IDs this task depends on
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task with the given ID, owning project and name.
    pub fn new(id: String, project_id: String, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            details: String::new(),
            project_id,
            status: TaskStatus::default(),
            completed: false,
            priority: Priority::default(),
            complexity: None,
            estimated_hours: None,
            depends_on: Vec::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// A task is finished when either the flag or the status says so.
    pub fn is_done(&self) -> bool {
        self.completed || self.status == TaskStatus::Done
    }

    /// Set status and keep the completion flag consistent with it.
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.completed = status == TaskStatus::Done;
    }

    /// Set the completion flag and keep the status consistent with it.
    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
        if completed {
            self.status = TaskStatus::Done;
        } else if self.status == TaskStatus::Done {
            self.status = TaskStatus::Pending;
        }
    }
}

/// A checklist item belonging to a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    /// Unique identifier (e.g., "tw-s-a1b2")
    pub id: String,

    /// Parent task
    pub task_id: String,

    /// Project of the parent task
    pub project_id: String,

    /// Subtask name
    pub name: String,

    /// Detailed description
    #[serde(default)]
    pub details: String,

    #[serde(default)]
    pub completed: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Subtask {
    /// Create a new, open subtask under `task`.
    pub fn new(id: String, task: &Task, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            task_id: task.id.clone(),
            project_id: task.project_id.clone(),
            name,
            details: String::new(),
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Materialize a breakdown suggestion as a subtask of `task`.
    pub fn from_suggestion(id: String, task: &Task, suggestion: &CreateTaskInput) -> Self {
        let mut subtask = Self::new(id, task, suggestion.name.clone());
        subtask.details = suggestion.details.clone();
        subtask
    }
}

/// A note an agent keeps for later sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    /// Unique identifier (e.g., "tw-m-a1b2")
    pub id: String,

    /// Short title
    pub title: String,

    /// Body text
    pub content: String,

    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Memory {
    /// Create a new memory with the given ID, title and content.
    pub fn new(id: String, title: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            content,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Case-insensitive match of `query` against title or content.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query) || self.content.to_lowercase().contains(&query)
    }
}

/// Description of a task that could be created. Never persisted directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    pub name: String,
    pub details: String,
    pub project_id: String,
    pub priority: Priority,
    pub complexity: i32,
    pub tags: Vec<String>,
    pub estimated_hours: f64,
}
