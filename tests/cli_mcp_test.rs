//! Integration tests for the MCP server.
//!
//! The server exposes every taskwell operation as a tool:
//! - `tw mcp manifest` prints tool definitions
//! - `tw mcp serve` speaks line-delimited JSON-RPC over stdio

mod common;

use common::TestEnv;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};

// === Manifest Tests ===

#[test]
fn test_mcp_manifest_outputs_json() {
    let env = TestEnv::new();

    env.tw()
        .args(["mcp", "manifest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tools"))
        .stdout(predicate::str::contains("analyze_task_complexity"));
}

#[test]
fn test_mcp_manifest_tool_has_schema() {
    let env = TestEnv::new();

    let output = env.tw().args(["mcp", "manifest"]).output().unwrap();
    let manifest: Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(manifest["name"], "taskwell");
    assert_eq!(manifest["protocolVersion"], "2024-11-05");

    let tools = manifest["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 12);
    for tool in tools {
        assert!(tool["name"].is_string());
        assert!(tool["description"].is_string());
        assert!(tool["inputSchema"].is_object());
    }

    let analyze = tools
        .iter()
        .find(|t| t["name"] == "analyze_task_complexity")
        .expect("analyze_task_complexity tool not found");
    let properties = analyze["inputSchema"]["properties"].as_object().unwrap();
    for key in [
        "workingDirectory",
        "taskId",
        "projectId",
        "complexityThreshold",
        "suggestBreakdown",
        "autoCreateSubtasks",
    ] {
        assert!(properties.contains_key(key), "missing {}", key);
    }
}

#[test]
fn test_mcp_help() {
    let env = TestEnv::new();

    env.tw()
        .args(["mcp", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("manifest"));
}

// === MCP Server Protocol Tests ===

/// A running `tw mcp serve` process.
struct McpServerHandle {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: i64,
}

impl McpServerHandle {
    fn spawn(env: &TestEnv) -> Self {
        let mut child = std::process::Command::new(env!("CARGO_BIN_EXE_tw"))
            .args(["mcp", "serve"])
            .current_dir(env.repo_path())
            .env("TW_DATA_DIR", env.data_path())
            .env("TW_CONFIG_DIR", env.config_dir.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to spawn MCP server");

        let stdin = child.stdin.take().expect("Failed to get stdin");
        let stdout = child.stdout.take().expect("Failed to get stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            next_id: 1,
        }
    }

    fn send_raw(&mut self, line: &str) {
        writeln!(self.stdin, "{}", line).expect("Failed to write");
        self.stdin.flush().expect("Failed to flush");
    }

    fn read_response(&mut self) -> Value {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("Failed to read");
        serde_json::from_str(&line).expect("Invalid JSON")
    }

    fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        let request = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        self.send_raw(&request.to_string());
        let response = self.read_response();
        assert_eq!(response["id"], id);
        response
    }

    fn initialize(&mut self) {
        let response = self.request(
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test", "version": "1.0" }
            }),
        );
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        // Notification: no response expected
        self.send_raw(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#);
    }

    /// Call a tool and return (text, isError).
    fn call_tool(&mut self, name: &str, arguments: Value) -> (String, bool) {
        let response = self.request("tools/call", json!({ "name": name, "arguments": arguments }));
        let result = &response["result"];
        (
            result["content"][0]["text"].as_str().unwrap().to_string(),
            result["isError"].as_bool().unwrap(),
        )
    }
}

impl Drop for McpServerHandle {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[test]
fn test_mcp_initialize_and_list_tools() {
    let env = TestEnv::new();
    let mut server = McpServerHandle::spawn(&env);
    server.initialize();

    let response = server.request("tools/list", json!({}));
    let tools = response["result"]["tools"].as_array().unwrap();
    assert!(tools.iter().any(|t| t["name"] == "get_next_task_recommendation"));

    let response = server.request("ping", json!({}));
    assert!(response["result"].is_object());
}

#[test]
fn test_mcp_unknown_method_and_bad_json() {
    let env = TestEnv::new();
    let mut server = McpServerHandle::spawn(&env);

    let response = server.request("prompts/list", json!({}));
    assert_eq!(response["error"]["code"], -32601);

    server.send_raw("{oops");
    let response = server.read_response();
    assert_eq!(response["error"]["code"], -32700);
}

#[test]
fn test_mcp_full_workflow() {
    let env = TestEnv::new();
    let wd = env.repo_path().to_string_lossy().to_string();
    let mut server = McpServerHandle::spawn(&env);
    server.initialize();

    let (text, is_error) = server.call_tool(
        "create_project",
        json!({ "workingDirectory": wd, "name": "Website" }),
    );
    assert!(!is_error, "{}", text);
    let project: Value = serde_json::from_str(&text).unwrap();
    let project_id = project["id"].as_str().unwrap().to_string();

    let (text, is_error) = server.call_tool(
        "create_task",
        json!({
            "workingDirectory": wd,
            "projectId": project_id,
            "name": "Platform",
            "details": "Research the database api and security model, then build and test it",
            "priority": "high"
        }),
    );
    assert!(!is_error, "{}", text);
    let task: Value = serde_json::from_str(&text).unwrap();
    let task_id = task["id"].as_str().unwrap().to_string();

    let (report, is_error) = server.call_tool(
        "analyze_task_complexity",
        json!({ "workingDirectory": wd, "projectId": project_id, "autoCreateSubtasks": true }),
    );
    assert!(!is_error, "{}", report);
    assert!(report.contains("### 1. Platform (Score: 7/10)"));
    assert!(report.contains("list_subtasks"));

    let (text, _) = server.call_tool(
        "list_subtasks",
        json!({ "workingDirectory": wd, "taskId": task_id }),
    );
    let subtasks: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(subtasks["count"], 3);

    let (text, _) = server.call_tool(
        "get_next_task_recommendation",
        json!({ "workingDirectory": wd }),
    );
    let next: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(next["task"]["id"], task_id.as_str());

    // The CLI sees what the server wrote
    let listed = env.tw_json(&["task", "list"]);
    assert_eq!(listed["count"], 1);
}

#[test]
fn test_mcp_tool_errors_are_flagged() {
    let env = TestEnv::new();
    let wd = env.repo_path().to_string_lossy().to_string();
    let mut server = McpServerHandle::spawn(&env);
    server.initialize();

    let (text, is_error) = server.call_tool(
        "analyze_task_complexity",
        json!({ "workingDirectory": wd, "taskId": "tw-ffff" }),
    );
    assert!(is_error);
    assert_eq!(text, "Error: Task not found: tw-ffff");

    let (text, is_error) = server.call_tool(
        "analyze_task_complexity",
        json!({ "workingDirectory": wd, "complexityThreshold": 0 }),
    );
    assert!(is_error);
    assert!(text.contains("complexityThreshold"));

    let (text, is_error) = server.call_tool("no_such_tool", json!({}));
    assert!(is_error);
    assert!(text.contains("Unknown tool"));
}
