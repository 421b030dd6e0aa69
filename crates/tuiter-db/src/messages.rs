use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, params};

use crate::models::MessageRow;
use crate::users::user_exists;
use crate::{Database, OptionalExt, new_id};

impl Database {
    /// Persists a direct message. Returns `None` if either user is unknown.
    pub fn insert_message(&self, sent_from: &str, sent_to: &str, message: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            if !user_exists(conn, sent_from)? || !user_exists(conn, sent_to)? {
                return Ok(None);
            }
            let id = new_id();
            conn.execute(
                "INSERT INTO messages (id, message, sent_from, sent_to, sent_on) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, message, sent_from, sent_to, Utc::now().to_rfc3339()],
            )?;
            query_message(conn, &id)
        })
    }

    pub fn get_messages_sent_by(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, "sent_from", user_id))
    }

    pub fn get_messages_sent_to(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, "sent_to", user_id))
    }

    pub fn delete_message(&self, id: &str) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM messages WHERE id = ?1", [id])?))
    }
}

fn map_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        message: row.get(1)?,
        sent_from: row.get(2)?,
        sent_to: row.get(3)?,
        sent_on: row.get(4)?,
    })
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<MessageRow>> {
    let row = conn
        .query_row(
            "SELECT id, message, sent_from, sent_to, sent_on FROM messages WHERE id = ?1",
            [id],
            map_message,
        )
        .optional()?;
    Ok(row)
}

/// `column` is always a literal from this module.
fn query_messages(conn: &Connection, column: &str, user_id: &str) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, message, sent_from, sent_to, sent_on
         FROM messages
         WHERE {} = ?1
         ORDER BY sent_on",
        column
    ))?;

    let rows = stmt
        .query_map([user_id], map_message)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
