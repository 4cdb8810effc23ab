//! Rebuilds a structural model of the database from the catalog and pragmas.
//!
//! Two passes: foreign keys first (tables only; views declare none), then
//! columns, so every column can be resolved against the full cross-table
//! reference map. A single object's failure skips that object; extraction
//! continues for the rest.

use std::{collections::HashMap, path::Path};

use rusqlite::Connection;

use crate::{
    core::{
        connect,
        types::{ColumnInfo, DatabaseSchema, FkReference, SchemaResponse, TableInfo},
    },
    error::AppResult,
};

/// Keyed by `table.column`, pointing at the referenced (table, column).
type FkMap = HashMap<String, FkReference>;

/// Extract the full schema. Always returns a response; a fatal engine error
/// yields an empty model with `error` set.
pub fn extract_schema(db_path: &Path, busy_timeout_ms: u64) -> SchemaResponse {
    tracing::info!(path = %db_path.display(), "extracting schema");

    if let Err(e) = connect::ensure_exists(db_path) {
        tracing::error!(error = %e, "schema extraction failed");
        return SchemaResponse {
            error: Some(e.to_string()),
            ..Default::default()
        };
    }

    match build_schema(db_path, busy_timeout_ms) {
        Ok(resp) => {
            tracing::info!(
                tables = resp.schema.tables.len(),
                "schema extraction finished"
            );
            resp
        }
        Err(e) => {
            tracing::error!(path = %db_path.display(), error = %e, "schema extraction failed");
            SchemaResponse {
                error: Some(e.to_string()),
                ..Default::default()
            }
        }
    }
}

fn build_schema(db_path: &Path, busy_timeout_ms: u64) -> AppResult<SchemaResponse> {
    let conn = connect::open_ro(db_path, busy_timeout_ms)?;
    let objects = list_objects(&conn)?;

    // First pass: global foreign-key map. A table whose FK pragma fails is
    // logged and left out of the map, not fatal.
    let mut fk_map = FkMap::new();
    for (kind, name) in &objects {
        if kind != "table" {
            continue;
        }
        if let Err(e) = collect_foreign_keys(&conn, name, &mut fk_map) {
            tracing::warn!(table = %name, error = %e, "could not retrieve foreign keys");
        }
    }

    // Second pass: columns for every table and view, in catalog order.
    let mut tables = Vec::new();
    let mut table_names = Vec::new();
    for (_, name) in &objects {
        table_names.push(name.clone());
        match table_columns(&conn, name, &fk_map) {
            Ok(columns) => tables.push(TableInfo {
                name: name.clone(),
                columns,
            }),
            Err(e) => {
                tracing::error!(table = %name, error = %e, "error processing object, skipping");
                continue;
            }
        }
    }

    let database_name = db_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(SchemaResponse {
        schema: DatabaseSchema {
            name: database_name,
            tables,
        },
        table_names,
        error: None,
    })
}

/// All user tables and views, ordered by kind then name.
fn list_objects(conn: &Connection) -> AppResult<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT type, name FROM sqlite_master
         WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%'
         ORDER BY type, name",
    )?;
    let objects = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(objects)
}

fn collect_foreign_keys(conn: &Connection, table: &str, fk_map: &mut FkMap) -> AppResult<()> {
    conn.pragma(None, "foreign_key_list", table, |row| {
        let from: String = row.get("from")?;
        let referenced_table: String = row.get("table")?;
        // `to` is NULL when the FK targets the referenced table's implicit
        // primary key; fall back to the local column name in that case.
        let referenced_column: Option<String> = row.get("to")?;
        fk_map.insert(
            format!("{table}.{from}"),
            FkReference {
                table: referenced_table,
                column: referenced_column.unwrap_or_else(|| from.clone()),
            },
        );
        Ok(())
    })?;
    Ok(())
}

fn table_columns(conn: &Connection, table: &str, fk_map: &FkMap) -> AppResult<Vec<ColumnInfo>> {
    let mut columns = Vec::new();
    conn.pragma(None, "table_info", table, |row| {
        let name: String = row.get("name")?;
        // View columns may carry no declared type.
        let data_type: Option<String> = row.get("type")?;
        let pk: i64 = row.get("pk")?;

        let reference = fk_map.get(&format!("{table}.{name}")).cloned();
        columns.push(ColumnInfo {
            name,
            data_type: data_type.unwrap_or_default(),
            primary_key: pk > 0,
            foreign_key: reference.is_some(),
            references: reference,
        });
        Ok(())
    })?;
    Ok(columns)
}
