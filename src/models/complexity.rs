//! Complexity scoring and breakdown suggestions for tasks.
//!
//! Scores each task from a handful of independent heuristics, proposes
//! candidate subtasks for tasks at or above a threshold, and renders the
//! findings as a text report for the calling agent.
//!
//! # Heuristics
//!
//! Starting from the task's stored complexity (or 5), each check adds a fixed
//! number of points:
//! - **Long name** (> 50 chars): +1
//! - **High-complexity vocabulary** (more than 2 terms in details): +2
//! - **Action verbs** (more than 3 in details): +1
//! - **Long details** (> 500 chars): +1
//! - **Large estimate** (> 20 hours): +1
//! - **Many dependencies** (more than 3): +1
//!
//! The result is clamped to `1..=10`.
//!
//! # Example
//!
//! ```
//! use taskwell::models::Task;
//! use taskwell::models::complexity::score_task;
//!
//! let mut task = Task::new("tw-0001".into(), "tw-p-0001".into(), "Platform".into());
//! task.details = "Database migration touching the api and security layers".into();
//!
//! let score = score_task(&task);
//! assert_eq!(score.score, 7);
//! assert!(score.is_complex(7));
//! ```

use serde::Serialize;

use super::{CreateTaskInput, Task};

/// Thresholds and defaults used by the scorer and suggestion generator.
pub mod thresholds {
    /// Base score for tasks without a stored complexity.
    pub const DEFAULT_COMPLEXITY: i32 = 5;

    /// Lowest possible analysis score.
    pub const MIN_SCORE: i32 = 1;

    /// Highest possible analysis score.
    pub const MAX_SCORE: i32 = 10;

    /// Score at or above which a task is considered complex.
    pub const DEFAULT_THRESHOLD: i32 = 7;

    /// Maximum recommended name length (characters).
    pub const MAX_NAME_LENGTH: usize = 50;

    /// Maximum recommended details length (characters).
    pub const MAX_DETAILS_LENGTH: usize = 500;

    /// High-complexity keyword matches tolerated before adding points.
    pub const HIGH_COMPLEXITY_KEYWORD_LIMIT: usize = 2;

    /// Action verb matches tolerated before adding points.
    pub const ACTION_VERB_LIMIT: usize = 3;

    /// Estimated hours tolerated before adding points.
    pub const MAX_ESTIMATED_HOURS: f64 = 20.0;

    /// Dependency count tolerated before adding points.
    pub const MAX_DEPENDENCIES: usize = 3;

    /// Estimate assumed for template suggestions when the parent has none.
    pub const DEFAULT_TEMPLATE_HOURS: f64 = 8.0;

    /// Estimate assumed for the generic breakdown when the parent has none.
    pub const DEFAULT_GENERIC_HOURS: f64 = 16.0;

    /// Characters of parent details copied into each suggestion.
    pub const SUGGESTION_CONTEXT_CHARS: usize = 200;

    /// Characters of details shown per task in the report.
    pub const REPORT_PREVIEW_CHARS: usize = 100;
}

/// Vocabulary suggesting architectural or cross-cutting work.
pub const HIGH_COMPLEXITY_KEYWORDS: [&str; 11] = [
    "architecture",
    "system",
    "integration",
    "security",
    "performance",
    "scalability",
    "database",
    "api",
    "framework",
    "refactor",
    "migration",
];

/// Verbs that each tend to mark a separate step of work.
pub const ACTION_VERBS: [&str; 11] = [
    "implement",
    "create",
    "build",
    "develop",
    "design",
    "setup",
    "configure",
    "test",
    "deploy",
    "document",
    "research",
];

/// Name of the tool that recommends the next task to work on.
pub const NEXT_TASK_TOOL: &str = "get_next_task_recommendation";

/// Message returned when the selection contains no tasks at all.
pub const NO_TASKS_MESSAGE: &str =
    "No tasks found to analyze. Create some tasks first, or check the taskId/projectId filters.";

/// Result of scoring a single task.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ComplexityScore {
    /// Analysis score, always within `MIN_SCORE..=MAX_SCORE` once returned by [`score_task`].
    pub score: i32,

    /// Human-readable findings, in the order the checks ran.
    pub issues: Vec<String>,
}

impl ComplexityScore {
    /// Start from a base score with no findings.
    pub fn new(base: i32) -> Self {
        Self {
            score: base,
            issues: Vec::new(),
        }
    }

    /// Add a complexity indicator with an issue description.
    pub fn add(&mut self, points: i32, issue: impl Into<String>) {
        self.score = self.score.saturating_add(points);
        self.issues.push(issue.into());
    }

    /// Returns true if the score meets the threshold (inclusive).
    pub fn is_complex(&self, threshold: i32) -> bool {
        self.score >= threshold
    }

    fn clamped(mut self) -> Self {
        self.score = self.score.clamp(thresholds::MIN_SCORE, thresholds::MAX_SCORE);
        self
    }
}

/// Score a task's complexity.
///
/// Checks run against the task as stored; nothing is modified.
pub fn score_task(task: &Task) -> ComplexityScore {
    let mut score =
        ComplexityScore::new(task.complexity.unwrap_or(thresholds::DEFAULT_COMPLEXITY));
    let details_lower = task.details.to_lowercase();

    check_name_length(task, &mut score);
    check_high_complexity_keywords(&details_lower, &mut score);
    check_action_verbs(&details_lower, &mut score);
    check_details_length(task, &mut score);
    check_estimated_hours(task, &mut score);
    check_dependencies(task, &mut score);

    score.clamped()
}

fn check_name_length(task: &Task, score: &mut ComplexityScore) {
    let len = task.name.chars().count();
    if len > thresholds::MAX_NAME_LENGTH {
        score.add(
            1,
            format!(
                "Task name is very long ({} chars), suggesting multiple concerns",
                len
            ),
        );
    }
}

fn check_high_complexity_keywords(details_lower: &str, score: &mut ComplexityScore) {
    let count = count_terms(details_lower, &HIGH_COMPLEXITY_KEYWORDS);
    if count > thresholds::HIGH_COMPLEXITY_KEYWORD_LIMIT {
        score.add(2, format!("Contains {} high-complexity keywords", count));
    }
}

fn check_action_verbs(details_lower: &str, score: &mut ComplexityScore) {
    let count = count_terms(details_lower, &ACTION_VERBS);
    if count > thresholds::ACTION_VERB_LIMIT {
        score.add(
            1,
            format!("Contains {} action verbs, suggesting multiple steps", count),
        );
    }
}

fn check_details_length(task: &Task, score: &mut ComplexityScore) {
    let len = task.details.chars().count();
    if len > thresholds::MAX_DETAILS_LENGTH {
        score.add(1, format!("Description is very detailed ({} chars)", len));
    }
}

fn check_estimated_hours(task: &Task, score: &mut ComplexityScore) {
    if let Some(hours) = task.estimated_hours {
        if hours > thresholds::MAX_ESTIMATED_HOURS {
            score.add(1, format!("High time estimate ({} hours)", hours));
        }
    }
}

fn check_dependencies(task: &Task, score: &mut ComplexityScore) {
    let count = task.depends_on.len();
    if count > thresholds::MAX_DEPENDENCIES {
        score.add(1, format!("Many dependencies ({})", count));
    }
}

/// Number of distinct vocabulary terms appearing as substrings of `text`.
fn count_terms(text: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|term| text.contains(*term)).count()
}

/// A keyword-triggered breakdown suggestion.
struct BreakdownTemplate {
    title: &'static str,
    description: &'static str,
    triggers: &'static [&'static str],
    tags: &'static [&'static str],
}

/// Evaluated in this order; each contributes at most one suggestion.
const BREAKDOWN_TEMPLATES: [BreakdownTemplate; 5] = [
    BreakdownTemplate {
        title: "Research and Analysis",
        description: "Research requirements, constraints and existing solutions for: ",
        triggers: &["research", "investigate", "analyze"],
        tags: &["research", "analysis"],
    },
    BreakdownTemplate {
        title: "Design and Planning",
        description: "Design the approach and plan the architecture for: ",
        triggers: &["design", "architecture", "plan"],
        tags: &["design", "planning"],
    },
    BreakdownTemplate {
        title: "Core Implementation",
        description: "Implement the core functionality for: ",
        triggers: &["implement", "develop", "build", "code"],
        tags: &["implementation", "development"],
    },
    BreakdownTemplate {
        title: "Testing and Validation",
        description: "Write tests and validate the behavior of: ",
        triggers: &["test", "testing", "validation"],
        tags: &["testing", "validation"],
    },
    BreakdownTemplate {
        title: "Documentation",
        description: "Write documentation and usage guides for: ",
        triggers: &["document", "documentation", "guide"],
        tags: &["documentation"],
    },
];

/// One phase of the fallback breakdown.
struct GenericPhase {
    title: &'static str,
    description: &'static str,
    complexity_offset: i32,
    hours_share: f64,
    tags: &'static [&'static str],
}

const GENERIC_PHASES: [GenericPhase; 3] = [
    GenericPhase {
        title: "Planning",
        description: "Plan the approach and break down the requirements for: ",
        complexity_offset: 3,
        hours_share: 1.0,
        tags: &["planning"],
    },
    GenericPhase {
        title: "Implementation",
        description: "Carry out the main work for: ",
        complexity_offset: 2,
        hours_share: 2.0,
        tags: &["implementation"],
    },
    GenericPhase {
        title: "Testing",
        description: "Verify and test the results of: ",
        complexity_offset: 3,
        hours_share: 1.0,
        tags: &["testing"],
    },
];

/// Propose subtasks for a complex task.
///
/// Template suggestions come out in template order. When no template
/// matches, a three-phase Planning / Implementation / Testing breakdown is
/// returned instead, so the result is never empty.
pub fn suggest_breakdown(task: &Task) -> Vec<CreateTaskInput> {
    let details_lower = task.details.to_lowercase();
    let context: String = task
        .details
        .chars()
        .take(thresholds::SUGGESTION_CONTEXT_CHARS)
        .collect();
    let parent_complexity = task.complexity.unwrap_or(thresholds::DEFAULT_COMPLEXITY);

    let suggestions: Vec<CreateTaskInput> = BREAKDOWN_TEMPLATES
        .iter()
        .filter(|template| {
            template
                .triggers
                .iter()
                .any(|trigger| details_lower.contains(trigger))
        })
        .map(|template| CreateTaskInput {
            name: format!("{} for {}", template.title, task.name),
            details: format!("{}{}", template.description, context),
            project_id: task.project_id.clone(),
            priority: task.priority,
            complexity: (parent_complexity - 2).max(thresholds::MIN_SCORE),
            tags: to_tags(template.tags),
            estimated_hours: (task
                .estimated_hours
                .unwrap_or(thresholds::DEFAULT_TEMPLATE_HOURS)
                / 3.0)
                .round(),
        })
        .collect();

    if !suggestions.is_empty() {
        return suggestions;
    }

    let phase_hours = task
        .estimated_hours
        .unwrap_or(thresholds::DEFAULT_GENERIC_HOURS)
        / 3.0;

    GENERIC_PHASES
        .iter()
        .map(|phase| CreateTaskInput {
            name: format!("{} for {}", phase.title, task.name),
            details: format!("{}{}", phase.description, context),
            project_id: task.project_id.clone(),
            priority: task.priority,
            complexity: (parent_complexity - phase.complexity_offset).max(thresholds::MIN_SCORE),
            tags: to_tags(phase.tags),
            estimated_hours: (phase_hours * phase.hours_share).round(),
        })
        .collect()
}

fn to_tags(tags: &[&str]) -> Vec<String> {
    tags.iter().map(|t| t.to_string()).collect()
}

/// Analysis of one task.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub task: Task,
    pub analysis_score: i32,
    pub issues: Vec<String>,
    pub suggestions: Vec<CreateTaskInput>,
}

/// Aggregate analysis over a selection of tasks.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityAnalysisResult {
    pub complex_tasks: Vec<AnalysisResult>,
    pub simple_tasks_count: usize,
    pub total_tasks_analyzed: usize,
    pub average_complexity: f64,
}

/// Score every open task and collect the complex ones.
///
/// Finished tasks (completed flag or `done` status) are skipped entirely:
/// they count neither as complex nor as simple, and do not enter the average.
pub fn analyze_tasks(
    tasks: &[Task],
    threshold: i32,
    suggest: bool,
) -> ComplexityAnalysisResult {
    let mut result = ComplexityAnalysisResult::default();
    let mut score_sum: i64 = 0;

    for task in tasks.iter().filter(|t| !t.is_done()) {
        let score = score_task(task);
        result.total_tasks_analyzed += 1;
        score_sum += i64::from(score.score);

        if score.is_complex(threshold) {
            let suggestions = if suggest {
                suggest_breakdown(task)
            } else {
                Vec::new()
            };
            result.complex_tasks.push(AnalysisResult {
                task: task.clone(),
                analysis_score: score.score,
                issues: score.issues,
                suggestions,
            });
        } else {
            result.simple_tasks_count += 1;
        }
    }

    if result.total_tasks_analyzed > 0 {
        result.average_complexity = score_sum as f64 / result.total_tasks_analyzed as f64;
    }

    result
}

/// Which body the report gets after the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLayout {
    /// Nothing above the threshold.
    AllClear,
    /// Complex tasks listed; the agent should create subtasks itself.
    ManualBreakdown,
    /// Complex tasks listed; subtasks were already created.
    AutoCreated,
}

impl ReportLayout {
    /// Decision table over (complex task count, auto-creation happened).
    pub fn select(complex_count: usize, auto_created: bool) -> Self {
        match (complex_count, auto_created) {
            (0, false) => ReportLayout::AllClear,
            (0, true) => ReportLayout::AllClear,
            (_, false) => ReportLayout::ManualBreakdown,
            (_, true) => ReportLayout::AutoCreated,
        }
    }
}

/// Render the analysis as a text report.
pub fn render_report(
    result: &ComplexityAnalysisResult,
    threshold: i32,
    auto_created: bool,
) -> String {
    let complex_count = result.complex_tasks.len();
    let mut report = String::new();

    report.push_str("# Task Complexity Analysis\n\n");
    report.push_str("**Summary:**\n");
    report.push_str(&format!(
        "- Total tasks analyzed: {}\n",
        result.total_tasks_analyzed
    ));
    report.push_str(&format!(
        "- Complex tasks (score >= {}): {}\n",
        threshold, complex_count
    ));
    report.push_str(&format!("- Simple tasks: {}\n", result.simple_tasks_count));
    report.push_str(&format!(
        "- Average complexity: {:.1}/10\n\n",
        result.average_complexity
    ));

    let layout = ReportLayout::select(complex_count, auto_created);
    if layout == ReportLayout::AllClear {
        report.push_str(&format!(
            "All tasks are below the complexity threshold of {}. No breakdown needed.\n\n",
            threshold
        ));
        report.push_str(&format!(
            "Use `{}` to pick what to work on next.\n",
            NEXT_TASK_TOOL
        ));
        return report;
    }

    report.push_str("## Complex Tasks\n\n");
    for (i, analysis) in result.complex_tasks.iter().enumerate() {
        push_task_section(&mut report, i + 1, analysis);
    }

    if layout == ReportLayout::AutoCreated {
        report.push_str("Subtasks were created automatically for every complex task above.\n\n");
    }

    let has_suggestions = result
        .complex_tasks
        .iter()
        .any(|analysis| !analysis.suggestions.is_empty());
    report.push_str("## Next Steps\n\n");
    match layout {
        ReportLayout::ManualBreakdown if has_suggestions => {
            report.push_str("1. Review the suggested breakdowns above\n");
            report.push_str("2. Create the subtasks you want to keep with `create_subtask`\n");
            report.push_str(
                "3. Or re-run with `autoCreateSubtasks: true` to create them all automatically\n",
            );
        }
        ReportLayout::ManualBreakdown => {
            report.push_str("1. Split each task above into smaller pieces\n");
            report.push_str("2. Create those pieces with `create_subtask`\n");
            report.push_str(
                "3. Or re-run with `suggestBreakdown: true` to get suggested breakdowns\n",
            );
        }
        ReportLayout::AutoCreated => {
            report.push_str("1. Review the auto-created subtasks with `list_subtasks`\n");
            report.push_str("2. Adjust names or details with `update_subtask`\n");
            report.push_str("3. Mark subtasks completed as the work progresses\n");
        }
        ReportLayout::AllClear => {}
    }
    report.push_str(&format!(
        "\nUse `{}` to pick what to work on next.\n\n",
        NEXT_TASK_TOOL
    ));
    report.push_str(
        "Tip: aim for tasks that fit in a single working session; split anything that keeps scoring high.\n",
    );

    report
}

fn push_task_section(report: &mut String, number: usize, analysis: &AnalysisResult) {
    report.push_str(&format!(
        "### {}. {} (Score: {}/10)\n",
        number, analysis.task.name, analysis.analysis_score
    ));
    report.push_str(&format!(
        "**Details:** {}\n",
        preview(&analysis.task.details, thresholds::REPORT_PREVIEW_CHARS)
    ));
    if !analysis.issues.is_empty() {
        report.push_str(&format!("**Issues:** {}\n", analysis.issues.join("; ")));
    }
    if !analysis.suggestions.is_empty() {
        report.push_str("**Suggested breakdown:**\n");
        for suggestion in &analysis.suggestions {
            report.push_str(&format!(
                "- {} (Est: {}h)\n",
                suggestion.name, suggestion.estimated_hours
            ));
        }
    }
    report.push('\n');
}

/// First `max` characters of `text`, with an ellipsis when truncated.
fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
