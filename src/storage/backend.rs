//! The storage surface the complexity analysis depends on.
//!
//! Analysis only needs to read tasks and projects and to create subtasks, so
//! it is written against this trait instead of the concrete file store. Tests
//! substitute an in-memory implementation.

use crate::Result;
use crate::models::{Project, Subtask, Task};
use crate::storage::{SUBTASK_PREFIX, generate_id};

/// Read tasks and projects, and create subtasks.
pub trait TaskStore {
    /// Look up a task by ID, returning `None` if it does not exist.
    fn find_task(&self, id: &str) -> Result<Option<Task>>;

    /// All tasks belonging to a project, in storage order.
    fn get_tasks(&self, project_id: &str) -> Result<Vec<Task>>;

    /// All projects, in storage order.
    fn get_projects(&self) -> Result<Vec<Project>>;

    /// Persist a new subtask.
    fn create_subtask(&mut self, subtask: &Subtask) -> Result<()>;

    /// Pick an ID for a subtask about to be created.
    fn new_subtask_id(&self, seed: &str) -> Result<String> {
        Ok(generate_id(SUBTASK_PREFIX, seed))
    }
}
