//! MCP tool definitions and dispatch.
//!
//! Each tool maps onto one function in [`crate::commands`]. Every tool takes
//! a `workingDirectory` argument that selects the storage to use.

use crate::commands::{self, AnalyzeOptions, NewTask, Output, TaskUpdate};
use crate::models::complexity::NEXT_TASK_TOOL;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::path::PathBuf;

/// Tool definition for the MCP manifest and `tools/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Text returned from a tool call, flagged when it describes a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub text: String,
    pub is_error: bool,
}

impl ToolResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            text: format!("Error: {}", message),
            is_error: true,
        }
    }

    /// Render as an MCP `tools/call` result.
    pub fn to_result(&self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": self.is_error,
        })
    }
}

/// Build an object schema that always requires `workingDirectory`.
fn schema(properties: Value, required: &[&str]) -> Value {
    let mut props = Map::new();
    props.insert(
        "workingDirectory".to_string(),
        json!({
            "type": "string",
            "description": "Absolute path of the directory whose records to use"
        }),
    );
    if let Value::Object(extra) = properties {
        props.extend(extra);
    }

    let mut req = vec!["workingDirectory"];
    req.extend_from_slice(required);

    json!({
        "type": "object",
        "properties": props,
        "required": req,
    })
}

/// Get all available MCP tools.
pub fn get_tools() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "create_project",
            description: "Create a new project to group tasks",
            input_schema: schema(
                json!({
                    "name": { "type": "string", "description": "Project name" },
                    "description": { "type": "string", "description": "Optional description" }
                }),
                &["name"],
            ),
        },
        ToolDef {
            name: "list_projects",
            description: "List all projects",
            input_schema: schema(json!({}), &[]),
        },
        ToolDef {
            name: "create_task",
            description: "Create a task in a project",
            input_schema: schema(
                json!({
                    "projectId": { "type": "string" },
                    "name": { "type": "string" },
                    "details": { "type": "string" },
                    "priority": { "type": "string", "enum": ["low", "medium", "high"] },
                    "complexity": { "type": "integer", "minimum": 1, "maximum": 10 },
                    "estimatedHours": { "type": "number", "minimum": 0 },
                    "dependsOn": { "type": "array", "items": { "type": "string" } },
                    "tags": { "type": "array", "items": { "type": "string" } }
                }),
                &["projectId", "name"],
            ),
        },
        ToolDef {
            name: "list_tasks",
            description: "List tasks, optionally filtered by project and status",
            input_schema: schema(
                json!({
                    "projectId": { "type": "string" },
                    "status": {
                        "type": "string",
                        "enum": ["pending", "in-progress", "blocked", "done"]
                    }
                }),
                &[],
            ),
        },
        ToolDef {
            name: "update_task",
            description: "Update a task. Setting status to done marks it completed and vice versa",
            input_schema: schema(
                json!({
                    "taskId": { "type": "string" },
                    "name": { "type": "string" },
                    "details": { "type": "string" },
                    "status": {
                        "type": "string",
                        "enum": ["pending", "in-progress", "blocked", "done"]
                    },
                    "completed": { "type": "boolean" },
                    "priority": { "type": "string", "enum": ["low", "medium", "high"] },
                    "complexity": { "type": "integer", "minimum": 1, "maximum": 10 },
                    "estimatedHours": { "type": "number", "minimum": 0 },
                    "dependsOn": { "type": "array", "items": { "type": "string" } },
                    "tags": { "type": "array", "items": { "type": "string" } }
                }),
                &["taskId"],
            ),
        },
        ToolDef {
            name: "create_subtask",
            description: "Create a subtask under a task",
            input_schema: schema(
                json!({
                    "taskId": { "type": "string" },
                    "name": { "type": "string" },
                    "details": { "type": "string" }
                }),
                &["taskId", "name"],
            ),
        },
        ToolDef {
            name: "list_subtasks",
            description: "List the subtasks of a task",
            input_schema: schema(json!({ "taskId": { "type": "string" } }), &["taskId"]),
        },
        ToolDef {
            name: "update_subtask",
            description: "Update a subtask's name, details or completion",
            input_schema: schema(
                json!({
                    "subtaskId": { "type": "string" },
                    "name": { "type": "string" },
                    "details": { "type": "string" },
                    "completed": { "type": "boolean" }
                }),
                &["subtaskId"],
            ),
        },
        ToolDef {
            name: "create_memory",
            description: "Store a note to recall in later sessions",
            input_schema: schema(
                json!({
                    "title": { "type": "string" },
                    "content": { "type": "string" },
                    "tags": { "type": "array", "items": { "type": "string" } }
                }),
                &["title", "content"],
            ),
        },
        ToolDef {
            name: "list_memories",
            description: "List memories, filtered by tag and/or a case-insensitive text query",
            input_schema: schema(
                json!({
                    "tag": { "type": "string" },
                    "query": { "type": "string" }
                }),
                &[],
            ),
        },
        ToolDef {
            name: NEXT_TASK_TOOL,
            description: "Recommend the next task: highest priority, then lowest complexity, then oldest, among open tasks whose dependencies are done",
            input_schema: schema(json!({ "projectId": { "type": "string" } }), &[]),
        },
        ToolDef {
            name: "analyze_task_complexity",
            description: "Score task complexity, suggest breakdowns for complex tasks and optionally create them as subtasks",
            input_schema: schema(
                json!({
                    "taskId": { "type": "string", "description": "Analyze only this task" },
                    "projectId": { "type": "string", "description": "Analyze only this project's tasks" },
                    "complexityThreshold": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 10,
                        "description": "Score at or above which a task is complex (default 7)"
                    },
                    "suggestBreakdown": { "type": "boolean", "description": "Propose subtasks (default true)" },
                    "autoCreateSubtasks": { "type": "boolean", "description": "Create every proposed subtask (default false)" }
                }),
                &[],
            ),
        },
    ]
}

/// Typed access to a tool's `arguments` object.
struct ToolArgs<'a> {
    args: &'a Value,
}

impl<'a> ToolArgs<'a> {
    fn new(args: &'a Value) -> Result<Self> {
        if !args.is_object() && !args.is_null() {
            return Err(Error::InvalidInput(
                "Tool arguments must be an object".to_string(),
            ));
        }
        Ok(Self { args })
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.args.get(key).filter(|v| !v.is_null())
    }

    fn opt_str(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(type_error(key, "a string")),
        }
    }

    fn required_str(&self, key: &str) -> Result<String> {
        self.opt_str(key)?.ok_or_else(|| {
            Error::InvalidInput(format!("Missing required argument: {}", key))
        })
    }

    fn opt_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(type_error(key, "a boolean")),
        }
    }

    /// Integer argument. Clients may send whole numbers as floats (`7.0`).
    fn opt_i32(&self, key: &str) -> Result<Option<i32>> {
        let Some(v) = self.get(key) else {
            return Ok(None);
        };
        if let Some(n) = v.as_i64() {
            return i32::try_from(n)
                .map(Some)
                .map_err(|_| type_error(key, "a 32-bit integer"));
        }
        match v.as_f64() {
            Some(n) if n.fract() == 0.0 && n >= i32::MIN as f64 && n <= i32::MAX as f64 => {
                Ok(Some(n as i32))
            }
            Some(n) => Err(Error::InvalidInput(format!(
                "Argument {} must be a whole number, got {}",
                key, n
            ))),
            None => Err(type_error(key, "a number")),
        }
    }

    fn opt_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| type_error(key, "a number")),
        }
    }

    fn opt_str_list(&self, key: &str) -> Result<Option<Vec<String>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| type_error(key, "an array of strings"))
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(_) => Err(type_error(key, "an array of strings")),
        }
    }

    fn working_directory(&self) -> Result<PathBuf> {
        let dir = self.required_str("workingDirectory")?;
        if dir.trim().is_empty() {
            return Err(Error::InvalidInput(
                "workingDirectory cannot be empty".to_string(),
            ));
        }
        Ok(PathBuf::from(dir))
    }
}

fn type_error(key: &str, expected: &str) -> Error {
    Error::InvalidInput(format!("Argument {} must be {}", key, expected))
}

/// Call a tool by name. Never fails: errors come back as flagged text.
pub fn dispatch(name: &str, args: &Value) -> ToolResponse {
    match call_tool(name, args) {
        Ok(text) => ToolResponse::ok(text),
        Err(e) => {
            tracing::warn!(tool = name, error = %e, "Tool call failed");
            ToolResponse::error(e)
        }
    }
}

fn call_tool(name: &str, args: &Value) -> Result<String> {
    let args = ToolArgs::new(args)?;

    match name {
        "create_project" => {
            let dir = args.working_directory()?;
            let result = commands::project_create(
                &dir,
                args.required_str("name")?,
                args.opt_str("description")?,
            )?;
            Ok(result.to_json())
        }
        "list_projects" => {
            let dir = args.working_directory()?;
            Ok(commands::project_list(&dir)?.to_json())
        }
        "create_task" => {
            let dir = args.working_directory()?;
            let input = NewTask {
                project_id: args.required_str("projectId")?,
                name: args.required_str("name")?,
                details: args.opt_str("details")?,
                priority: args.opt_str("priority")?,
                complexity: args.opt_i32("complexity")?,
                estimated_hours: args.opt_f64("estimatedHours")?,
                depends_on: args.opt_str_list("dependsOn")?.unwrap_or_default(),
                tags: args.opt_str_list("tags")?.unwrap_or_default(),
            };
            Ok(commands::task_create(&dir, input)?.to_json())
        }
        "list_tasks" => {
            let dir = args.working_directory()?;
            let project_id = args.opt_str("projectId")?;
            let status = args.opt_str("status")?;
            Ok(commands::task_list(&dir, project_id.as_deref(), status.as_deref())?.to_json())
        }
        "update_task" => {
            let dir = args.working_directory()?;
            let id = args.required_str("taskId")?;
            let update = TaskUpdate {
                name: args.opt_str("name")?,
                details: args.opt_str("details")?,
                status: args.opt_str("status")?,
                completed: args.opt_bool("completed")?,
                priority: args.opt_str("priority")?,
                complexity: args.opt_i32("complexity")?,
                estimated_hours: args.opt_f64("estimatedHours")?,
                depends_on: args.opt_str_list("dependsOn")?,
                tags: args.opt_str_list("tags")?,
            };
            Ok(commands::task_update(&dir, &id, update)?.to_json())
        }
        "create_subtask" => {
            let dir = args.working_directory()?;
            let result = commands::subtask_create(
                &dir,
                &args.required_str("taskId")?,
                args.required_str("name")?,
                args.opt_str("details")?,
            )?;
            Ok(result.to_json())
        }
        "list_subtasks" => {
            let dir = args.working_directory()?;
            Ok(commands::subtask_list(&dir, &args.required_str("taskId")?)?.to_json())
        }
        "update_subtask" => {
            let dir = args.working_directory()?;
            let result = commands::subtask_update(
                &dir,
                &args.required_str("subtaskId")?,
                args.opt_str("name")?,
                args.opt_str("details")?,
                args.opt_bool("completed")?,
            )?;
            Ok(result.to_json())
        }
        "create_memory" => {
            let dir = args.working_directory()?;
            let result = commands::memory_create(
                &dir,
                args.required_str("title")?,
                args.required_str("content")?,
                args.opt_str_list("tags")?.unwrap_or_default(),
            )?;
            Ok(result.to_json())
        }
        "list_memories" => {
            let dir = args.working_directory()?;
            let tag = args.opt_str("tag")?;
            let query = args.opt_str("query")?;
            Ok(commands::memory_list(&dir, tag.as_deref(), query.as_deref())?.to_json())
        }
        NEXT_TASK_TOOL => {
            let dir = args.working_directory()?;
            let project_id = args.opt_str("projectId")?;
            Ok(commands::next_task(&dir, project_id.as_deref())?.to_json())
        }
        "analyze_task_complexity" => {
            let dir = args.working_directory()?;
            let options = AnalyzeOptions {
                task_id: args.opt_str("taskId")?,
                project_id: args.opt_str("projectId")?,
                threshold: args.opt_i32("complexityThreshold")?,
                suggest_breakdown: args.opt_bool("suggestBreakdown")?,
                auto_create_subtasks: args.opt_bool("autoCreateSubtasks")?.unwrap_or(false),
            };
            Ok(commands::analyze_complexity(&dir, options)?.report)
        }
        _ => Err(Error::InvalidInput(format!("Unknown tool: {}", name))),
    }
}
