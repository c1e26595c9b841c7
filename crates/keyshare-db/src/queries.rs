use crate::models::{DeviceRow, SessionRow, UserKeyRow};
use crate::Database;
use anyhow::{Result, bail};
use rusqlite::Connection;

impl Database {
    // -- Session --

    /// Replace any existing session. The organization selection and cached
    /// username belong to the old session and are dropped with it.
    pub fn save_session(&self, hostname: &str, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO session (id, hostname, token) VALUES (1, ?1, ?2)",
                (hostname, token),
            )?;
            Ok(())
        })
    }

    pub fn get_session(&self) -> Result<Option<SessionRow>> {
        self.with_conn(query_session)
    }

    /// Returns whether a session existed.
    pub fn clear_session(&self) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM session WHERE id = 1", [])? > 0))
    }

    pub fn set_username(&self, username: &str) -> Result<()> {
        self.update_session("UPDATE session SET username = ?1 WHERE id = 1", username)
    }

    pub fn set_organization(&self, organization_id: &str) -> Result<()> {
        self.update_session("UPDATE session SET organization_id = ?1 WHERE id = 1", organization_id)
    }

    fn update_session(&self, sql: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            if conn.execute(sql, [value])? == 0 {
                bail!("no active session");
            }
            Ok(())
        })
    }

    // -- Device --

    pub fn save_device_keys(&self, public_key: &str, private_key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO device (id, public_key, private_key) VALUES (1, ?1, ?2)",
                (public_key, private_key),
            )?;
            Ok(())
        })
    }

    pub fn get_device(&self) -> Result<Option<DeviceRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT public_key, private_key, created_at FROM device WHERE id = 1",
                [],
                |row| {
                    Ok(DeviceRow {
                        public_key: row.get(0)?,
                        private_key: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- User key --

    pub fn save_user_key(&self, public_key: &str, private_key_encrypted: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO user_key (id, public_key, private_key_encrypted) VALUES (1, ?1, ?2)",
                (public_key, private_key_encrypted),
            )?;
            Ok(())
        })
    }

    pub fn get_user_key(&self) -> Result<Option<UserKeyRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT public_key, private_key_encrypted, created_at FROM user_key WHERE id = 1",
                [],
                |row| {
                    Ok(UserKeyRow {
                        public_key: row.get(0)?,
                        private_key_encrypted: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
        })
    }
}

fn query_session(conn: &Connection) -> Result<Option<SessionRow>> {
    let mut stmt = conn.prepare(
        "SELECT hostname, token, username, organization_id, created_at FROM session WHERE id = 1",
    )?;

    let row = stmt
        .query_row([], |row| {
            Ok(SessionRow {
                hostname: row.get(0)?,
                token: row.get(1)?,
                username: row.get(2)?,
                organization_id: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
