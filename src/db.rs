//! SQLite connection helper shared by the stores.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::time::Duration;

/// Open a connection with a busy timeout so concurrent writers wait instead of failing.
pub fn open(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path))?;
    conn.busy_timeout(Duration::from_secs(5))
        .context("Failed to set busy timeout")?;
    Ok(conn)
}
