use anyhow::Result;
use rusqlite::Connection;
use tracing::debug;

/// Every table holds at most one row, pinned to `id = 1`.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS session (
            id               INTEGER PRIMARY KEY CHECK (id = 1),
            hostname         TEXT NOT NULL,
            token            TEXT NOT NULL,
            username         TEXT,
            organization_id  TEXT,
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS device (
            id           INTEGER PRIMARY KEY CHECK (id = 1),
            public_key   TEXT NOT NULL,
            private_key  TEXT NOT NULL,
            created_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- User private key, sealed under the device public key
        CREATE TABLE IF NOT EXISTS user_key (
            id                     INTEGER PRIMARY KEY CHECK (id = 1),
            public_key             TEXT NOT NULL,
            private_key_encrypted  TEXT NOT NULL,
            created_at             TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    debug!("Database migrations complete");
    Ok(())
}
