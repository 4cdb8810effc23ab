//! JSON-RPC 2.0 over stdio.
//!
//! Implements the minimal tool surface an agent orchestrator needs:
//! - initialize
//! - tools/list
//! - tools/call: execute_query, get_schema, get_metadata
//!
//! The core operations are blocking units of work (full table scans, size
//! sampling), so each call is dispatched to the blocking pool instead of
//! running on the event loop.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt};

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    tools::ToolRegistry,
};

pub async fn run(config: AppConfig) -> AppResult<()> {
    let registry = Arc::new(ToolRegistry::builtin());

    let mut stdin = io::BufReader::new(io::stdin());
    let mut stdout = io::BufWriter::new(io::stdout());
    let mut line = String::new();

    loop {
        line.clear();
        let n = stdin.read_line(&mut line).await?;
        if n == 0 {
            break;
        }
        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }

        let msg: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                let resp = jsonrpc_error(Value::Null, -32700, format!("parse error: {e}"));
                write_line(&mut stdout, &resp).await?;
                continue;
            }
        };

        // Notifications (no id) are ignored.
        let id = msg.get("id").cloned().unwrap_or(Value::Null);
        if id.is_null() {
            continue;
        }

        let Some(method) = msg.get("method").and_then(|m| m.as_str()) else {
            let resp = jsonrpc_error(id, -32600, "invalid request: missing method".into());
            write_line(&mut stdout, &resp).await?;
            continue;
        };

        let params = msg.get("params").cloned().unwrap_or(Value::Null);

        let resp = match method {
            "initialize" => handle_initialize(id),
            "tools/list" => handle_tools_list(id, &registry),
            "tools/call" => handle_tools_call(id, params, &config, &registry).await,
            _ => jsonrpc_error(id, -32601, format!("method not found: {method}")),
        };

        write_line(&mut stdout, &resp).await?;
    }

    Ok(())
}

fn handle_initialize(id: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "serverInfo": {
                "name": "sqlite-agent",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": { "listChanged": false }
            }
        }
    })
}

fn handle_tools_list(id: Value, registry: &ToolRegistry) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": { "tools": registry.list() }
    })
}

async fn handle_tools_call(
    id: Value,
    params: Value,
    config: &AppConfig,
    registry: &Arc<ToolRegistry>,
) -> Value {
    let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
        return jsonrpc_error(id, -32602, "invalid params: missing name".into());
    };
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

    let name = name.to_string();
    let config = config.clone();
    let registry = Arc::clone(registry);
    let res = tokio::task::spawn_blocking(move || registry.call(&name, &config, arguments))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))
        .and_then(|r| r);

    match res {
        Ok(structured) => {
            let text = serde_json::to_string_pretty(&structured)
                .unwrap_or_else(|_| "<result>".to_string());
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "content": [{ "type": "text", "text": text }],
                    "structuredContent": structured,
                    "isError": false
                }
            })
        }
        Err(e) => serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "content": [{ "type": "text", "text": format!("{}: {}", e.code(), e) }],
                "isError": true
            }
        }),
    }
}

async fn write_line(w: &mut io::BufWriter<io::Stdout>, v: &Value) -> AppResult<()> {
    let payload = serde_json::to_vec(v)?;
    w.write_all(&payload).await?;
    w.write_all(b"\n").await?;
    w.flush().await?;
    Ok(())
}

fn jsonrpc_error(id: Value, code: i64, message: String) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}
