use std::{
    path::Path,
    time::Duration,
};

use rusqlite::{Connection, OpenFlags};

use crate::error::{AppError, AppResult};

/// All operations target an existing database file; none of them create one.
pub fn ensure_exists(path: &Path) -> AppResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(AppError::NotFound(path.to_path_buf()))
    }
}

/// Open a short-lived read-write connection. Callers hold it for exactly one
/// batch and drop it on every exit path.
pub fn open_rw(path: &Path, busy_timeout_ms: u64) -> AppResult<Connection> {
    open_with(path, OpenFlags::SQLITE_OPEN_READ_WRITE, busy_timeout_ms)
}

/// Read-only variant for the extraction passes.
pub fn open_ro(path: &Path, busy_timeout_ms: u64) -> AppResult<Connection> {
    open_with(path, OpenFlags::SQLITE_OPEN_READ_ONLY, busy_timeout_ms)
}

fn open_with(path: &Path, flags: OpenFlags, busy_timeout_ms: u64) -> AppResult<Connection> {
    let conn = Connection::open_with_flags(path, flags).map_err(|source| AppError::DbOpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    Ok(conn)
}
