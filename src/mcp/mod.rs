//! MCP (Model Context Protocol) server implementation.
//!
//! This module provides:
//! - `tw mcp serve` - Start stdio MCP server
//! - `tw mcp manifest` - Output tool definitions
//!
//! The server speaks line-delimited JSON-RPC 2.0: one request per line on
//! stdin, one response per line on stdout. Notifications get no response.

pub mod tools;

use crate::Result;
use serde::Deserialize;
use serde_json::{Value, json};
use std::io::{BufRead, Write};

pub use tools::{ToolDef, ToolResponse, dispatch, get_tools};

/// MCP protocol revision implemented by the server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported during initialization.
pub const SERVER_NAME: &str = "taskwell";

/// JSON-RPC error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
}

fn success(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn failure(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() }
    })
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

/// Handle one line of input, returning the response to write, if any.
pub fn handle_line(line: &str) -> Option<Value> {
    let message: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed JSON-RPC message");
            return Some(failure(
                Value::Null,
                error_codes::PARSE_ERROR,
                format!("Parse error: {}", e),
            ));
        }
    };
    handle_message(&message)
}

/// An incoming JSON-RPC request or notification.
#[derive(Debug, Deserialize)]
struct Request {
    /// Absent on notifications.
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

/// Params of `tools/call`.
#[derive(Debug, Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Handle one parsed JSON-RPC message.
pub fn handle_message(message: &Value) -> Option<Value> {
    let request = match Request::deserialize(message) {
        Ok(request) => request,
        Err(e) => {
            let id = message.get("id").cloned().unwrap_or(Value::Null);
            return Some(failure(
                id,
                error_codes::INVALID_REQUEST,
                format!("Invalid request: {}", e),
            ));
        }
    };
    tracing::debug!(method = %request.method, "MCP request");

    // Notifications carry no id and never get a response.
    let id = request.id?;

    let response = match request.method.as_str() {
        "initialize" => success(id, initialize_result()),
        "ping" => success(id, json!({})),
        "tools/list" => success(id, json!({ "tools": get_tools() })),
        "tools/call" => {
            let params = request.params.unwrap_or(Value::Null);
            let call = match ToolCall::deserialize(params) {
                Ok(call) => call,
                Err(e) => {
                    return Some(failure(
                        id,
                        error_codes::INVALID_PARAMS,
                        format!("Invalid params: {}", e),
                    ));
                }
            };
            let response = dispatch(&call.name, &call.arguments);
            success(id, response.to_result())
        }
        method => failure(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        ),
    };
    Some(response)
}

/// Serve requests from `input` until EOF, writing responses to `output`.
pub fn serve_io<R: BufRead, W: Write>(input: R, mut output: W) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Some(response) = handle_line(&line) {
            writeln!(output, "{}", serde_json::to_string(&response)?)?;
            output.flush()?;
        }
    }
    Ok(())
}

/// Start the MCP stdio server.
pub fn serve() -> Result<()> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "MCP server starting");
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let result = serve_io(stdin.lock(), stdout.lock());
    tracing::info!("MCP server stopped");
    result
}

/// Build the manifest describing the server and its tools.
pub fn manifest_value() -> Value {
    json!({
        "name": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "protocolVersion": PROTOCOL_VERSION,
        "tools": get_tools(),
    })
}

/// Output the MCP tool manifest.
pub fn manifest() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&manifest_value())?);
    Ok(())
}
