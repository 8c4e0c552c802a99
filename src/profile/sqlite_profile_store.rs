use super::{ProfileStore, UserProfile};
use crate::sqlite_column;
use crate::sqlite_persistence::{open_versioned, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// V 0
const PROFILE_TABLE_V_0: Table = Table {
    name: "profile",
    columns: &[
        sqlite_column!("email", &SqlType::Text, is_primary_key = true),
        sqlite_column!("document", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!(
            "updated",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[PROFILE_TABLE_V_0],
    migration: None,
}];

#[derive(Clone)]
pub struct SqliteProfileStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProfileStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = open_versioned(&db_path, VERSIONED_SCHEMAS)
            .with_context(|| format!("Failed to open profile db {:?}", db_path.as_ref()))?;
        Ok(SqliteProfileStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl ProfileStore for SqliteProfileStore {
    fn get_document(&self, email: &str) -> Result<Option<Value>> {
        let conn = self.conn.lock().unwrap();
        let raw: Option<String> = conn
            .query_row(
                "SELECT document FROM profile WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            None => Ok(None),
            Some(raw) => Ok(Some(
                serde_json::from_str(&raw)
                    .with_context(|| format!("Corrupted profile document for {}", email))?,
            )),
        }
    }

    fn save_profile(&self, email: &str, profile: &UserProfile) -> Result<()> {
        let document = serde_json::to_string(&profile.to_document())?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO profile (email, document) VALUES (?1, ?2)
             ON CONFLICT(email) DO UPDATE SET
                document = excluded.document,
                updated = cast(strftime('%s','now') as int)",
            params![email, document],
        )?;
        debug!("Saved profile for {}", email);
        Ok(())
    }

    fn delete_profile(&self, email: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM profile WHERE email = ?1", params![email])?;
        Ok(deleted > 0)
    }

    fn list_emails(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT email FROM profile ORDER BY email")?;
        let emails = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(emails)
    }
}
