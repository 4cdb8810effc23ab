//! Explicit tool registry: a static map from tool name to a typed handler.
//!
//! Tools are registered once at startup; there is no runtime discovery. Each
//! handler takes the injected configuration plus the caller's JSON arguments
//! and returns the operation's JSON result.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::{
    config::AppConfig,
    core::{executor, executor::QueryParams, metadata, schema},
    error::{AppError, AppResult},
};

pub type ToolFn = fn(&AppConfig, Value) -> AppResult<Value>;

pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    handler: ToolFn,
}

pub struct ToolRegistry {
    tools: BTreeMap<&'static str, ToolSpec>,
}

impl ToolRegistry {
    /// The built-in database tools.
    pub fn builtin() -> Self {
        let mut registry = Self {
            tools: BTreeMap::new(),
        };
        registry.register(ToolSpec {
            name: "execute_query",
            description:
                "Execute one or more SQL statements against the configured SQLite database. \
                 Write statements require write access to be enabled.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "params": { "type": "object" },
                    "max_rows": { "type": "integer", "minimum": 1 }
                },
                "required": ["query"]
            }),
            handler: tool_execute_query,
        });
        registry.register(ToolSpec {
            name: "get_schema",
            description:
                "Extract the database structure: tables, views, columns, primary and foreign keys.",
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
            handler: tool_get_schema,
        });
        registry.register(ToolSpec {
            name: "get_metadata",
            description:
                "Extract database statistics: row counts, column and index counts, estimated sizes.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table_count": { "type": "integer", "minimum": 0 }
                }
            }),
            handler: tool_get_metadata,
        });
        registry
    }

    fn register(&mut self, spec: ToolSpec) {
        self.tools.insert(spec.name, spec);
    }

    /// Tool descriptors in MCP `tools/list` shape.
    pub fn list(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .values()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect();
        json!(tools)
    }

    pub fn call(&self, name: &str, config: &AppConfig, arguments: Value) -> AppResult<Value> {
        let spec = self
            .tools
            .get(name)
            .ok_or_else(|| AppError::InvalidRequest(format!("unknown tool: {name}")))?;
        (spec.handler)(config, arguments)
    }
}

fn tool_execute_query(config: &AppConfig, arguments: Value) -> AppResult<Value> {
    let sql = required_str(&arguments, "query")?;
    let params: Option<QueryParams> = arguments.get("params").and_then(|v| v.as_object()).map(|m| {
        m.iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<QueryParams>()
    });
    let max_rows = arguments
        .get("max_rows")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize);

    let batch = executor::execute_query(
        &config.db_path,
        sql,
        params.as_ref(),
        max_rows,
        &config.query,
    );
    Ok(serde_json::to_value(batch)?)
}

fn tool_get_schema(config: &AppConfig, _arguments: Value) -> AppResult<Value> {
    let resp = schema::extract_schema(&config.db_path, config.query.timeout_ms);
    Ok(serde_json::to_value(resp)?)
}

fn tool_get_metadata(config: &AppConfig, arguments: Value) -> AppResult<Value> {
    let table_count = arguments
        .get("table_count")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as usize;
    let resp = metadata::extract_metadata(
        &config.db_path,
        table_count,
        &config.metadata,
        config.query.timeout_ms,
    );
    Ok(serde_json::to_value(resp)?)
}

fn required_str<'a>(arguments: &'a Value, key: &str) -> AppResult<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::InvalidRequest(format!("missing or invalid field: {key}")))
}
