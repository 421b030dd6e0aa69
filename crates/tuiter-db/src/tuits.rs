use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, params};

use crate::models::{TuitRow, tuit_at, tuit_select};
use crate::users::user_exists;
use crate::{Database, OptionalExt, new_id};

/// Returns the first `#word` in `text` without its `#`, or an empty string.
/// A word is one or more ASCII letters, digits or underscores.
pub fn extract_tag(text: &str) -> String {
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut rest = text;
    while let Some(pos) = rest.find('#') {
        rest = &rest[pos + 1..];
        let end = rest.find(|c: char| !is_word(c)).unwrap_or(rest.len());
        if end > 0 {
            return rest[..end].to_string();
        }
    }
    String::new()
}

/// Counter columns on `tuits` that toggles may overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatColumn {
    Likes,
    Dislikes,
    Bookmarks,
}

impl StatColumn {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Likes => "likes",
            Self::Dislikes => "dislikes",
            Self::Bookmarks => "bookmarks",
        }
    }
}

impl Database {
    /// Inserts a tuit for `author`. Returns `None` if the author does not exist.
    pub fn create_tuit(&self, author: &str, text: &str) -> Result<Option<TuitRow>> {
        self.with_conn(|conn| {
            if !user_exists(conn, author)? {
                return Ok(None);
            }
            let id = new_id();
            conn.execute(
                "INSERT INTO tuits (id, tuit, tag, posted_on, posted_by) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, text, extract_tag(text), Utc::now().to_rfc3339(), author],
            )?;
            query_tuit(conn, &id)
        })
    }

    pub fn get_all_tuits(&self) -> Result<Vec<TuitRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY t.posted_on DESC", tuit_select()))?;
            let rows = stmt
                .query_map([], |row| tuit_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_tuit(&self, id: &str) -> Result<Option<TuitRow>> {
        self.with_conn(|conn| query_tuit(conn, id))
    }

    pub fn get_tuits_by_user(&self, author: &str) -> Result<Vec<TuitRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE t.posted_by = ?1 ORDER BY t.posted_on DESC",
                tuit_select()
            ))?;
            let rows = stmt
                .query_map([author], |row| tuit_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Replaces the text and re-derives the tag. `None` if the tuit is missing.
    pub fn update_tuit_text(&self, id: &str, text: &str) -> Result<Option<TuitRow>> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE tuits SET tuit = ?2, tag = ?3 WHERE id = ?1",
                params![id, text, extract_tag(text)],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_tuit(conn, id)
        })
    }

    /// Deletes only the tuit row; relation records are removed separately.
    pub fn delete_tuit(&self, id: &str) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM tuits WHERE id = ?1", [id])?))
    }

    pub fn delete_tuits_by_content(&self, text: &str) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM tuits WHERE tuit = ?1", [text])?))
    }
}

pub(crate) fn query_tuit(conn: &Connection, id: &str) -> Result<Option<TuitRow>> {
    let mut stmt = conn.prepare(&format!("{} WHERE t.id = ?1", tuit_select()))?;
    let row = stmt.query_row([id], |row| tuit_at(row, 0)).optional()?;
    Ok(row)
}

pub(crate) fn tuit_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM tuits WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn set_stat(conn: &Connection, id: &str, column: StatColumn, value: u32) -> Result<()> {
    conn.execute(
        &format!("UPDATE tuits SET {} = ?2 WHERE id = ?1", column.as_str()),
        params![id, value],
    )?;
    Ok(())
}
