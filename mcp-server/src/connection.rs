use anyhow::{Context, Result};
use rusqlite::Connection;

/// Open the store at `database_url` and make sure every table exists.
pub fn conn(database_url: &str) -> Result<Connection> {
    lotto6::database::create_database(database_url)
        .with_context(|| format!("opening database at {}", database_url))
}

/// A fresh in-memory store, used by tests and dry runs.
pub fn in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    lotto6::database::create_database_with_connection(&conn)?;
    Ok(conn)
}
