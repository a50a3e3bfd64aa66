//! Complexity analysis over a selection of stored tasks.
//!
//! Resolves which tasks to look at, scores them, optionally materializes
//! every breakdown suggestion as a subtask, and renders the report.

use super::Output;
use crate::models::complexity::{
    ComplexityAnalysisResult, NO_TASKS_MESSAGE, analyze_tasks, render_report, thresholds,
};
use crate::models::{Subtask, Task};
use crate::storage::TaskStore;
use crate::{Error, Result};
use serde::Serialize;

/// What to analyze and how.
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub task_id: Option<String>,
    pub project_id: Option<String>,
    pub threshold: i32,
    pub suggest_breakdown: bool,
    pub auto_create_subtasks: bool,
}

impl Default for AnalyzeRequest {
    fn default() -> Self {
        Self {
            task_id: None,
            project_id: None,
            threshold: thresholds::DEFAULT_THRESHOLD,
            suggest_breakdown: true,
            auto_create_subtasks: false,
        }
    }
}

/// Outcome of an analysis run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOutcome {
    /// `None` when the selection was empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ComplexityAnalysisResult>,
    pub threshold: i32,
    pub auto_created: bool,
    /// IDs of subtasks created during this run.
    pub created_subtasks: Vec<String>,
    pub report: String,
}

impl Output for AnalyzeOutcome {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        self.report.clone()
    }
}

/// Resolve the tasks to analyze.
///
/// A task ID wins over a project ID; with neither, every project is scanned
/// in storage order and their tasks concatenated.
pub fn select_tasks<S: TaskStore>(
    store: &S,
    task_id: Option<&str>,
    project_id: Option<&str>,
) -> Result<Vec<Task>> {
    if let Some(id) = task_id {
        let task = store
            .find_task(id)?
            .ok_or_else(|| Error::NotFound(format!("Task not found: {}", id)))?;
        return Ok(vec![task]);
    }

    if let Some(pid) = project_id {
        return store.get_tasks(pid);
    }

    let mut tasks = Vec::new();
    for project in store.get_projects()? {
        tasks.extend(store.get_tasks(&project.id)?);
    }
    Ok(tasks)
}

/// Persist every suggestion of every complex task as a subtask.
///
/// Writes happen one at a time; the first failure aborts the run and
/// subtasks already written stay in place.
pub fn create_suggested_subtasks<S: TaskStore>(
    store: &mut S,
    analysis: &ComplexityAnalysisResult,
) -> Result<Vec<String>> {
    let mut created = Vec::new();

    for result in &analysis.complex_tasks {
        for (index, suggestion) in result.suggestions.iter().enumerate() {
            let seed = format!("{}:{}:{}", result.task.id, index, suggestion.name);
            let id = store.new_subtask_id(&seed)?;
            let subtask = Subtask::from_suggestion(id, &result.task, suggestion);
            store.create_subtask(&subtask)?;
            tracing::debug!(subtask = %subtask.id, task = %result.task.id, "Created suggested subtask");
            created.push(subtask.id);
        }
    }

    Ok(created)
}

/// Run a complete analysis against `store`.
pub fn analyze<S: TaskStore>(store: &mut S, request: &AnalyzeRequest) -> Result<AnalyzeOutcome> {
    if !(thresholds::MIN_SCORE..=thresholds::MAX_SCORE).contains(&request.threshold) {
        return Err(Error::InvalidInput(format!(
            "complexityThreshold must be between {} and {}, got {}",
            thresholds::MIN_SCORE,
            thresholds::MAX_SCORE,
            request.threshold
        )));
    }

    let tasks = select_tasks(
        store,
        request.task_id.as_deref(),
        request.project_id.as_deref(),
    )?;

    if tasks.is_empty() {
        return Ok(AnalyzeOutcome {
            analysis: None,
            threshold: request.threshold,
            auto_created: false,
            created_subtasks: Vec::new(),
            report: NO_TASKS_MESSAGE.to_string(),
        });
    }

    let analysis = analyze_tasks(&tasks, request.threshold, request.suggest_breakdown);
    tracing::info!(
        analyzed = analysis.total_tasks_analyzed,
        complex = analysis.complex_tasks.len(),
        "Analyzed task complexity"
    );

    let created_subtasks = if request.auto_create_subtasks && request.suggest_breakdown {
        create_suggested_subtasks(store, &analysis)?
    } else {
        Vec::new()
    };
    let auto_created = !created_subtasks.is_empty();

    let report = render_report(&analysis, request.threshold, auto_created);
    Ok(AnalyzeOutcome {
        analysis: Some(analysis),
        threshold: request.threshold,
        auto_created,
        created_subtasks,
        report,
    })
}
