use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, ErrorCode, params};
use tracing::debug;

use tuiter_types::api::UpdateUserRequest;

use crate::models::{NewUser, UserRow, user_at, user_columns};
use crate::{Database, OptionalExt, new_id};

impl Database {
    /// Inserts a new account. `None` when the username is already taken,
    /// including when a concurrent insert claimed it first.
    pub fn create_user(&self, user: &NewUser) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let id = new_id();
            let inserted = conn.execute(
                "INSERT INTO users (id, username, password, first_name, last_name, email,
                                    profile_photo, header_image, account_type, marital_status,
                                    biography, date_of_birth, joined, latitude, longitude)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    id,
                    user.username,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    user.email,
                    user.profile_photo,
                    user.header_image,
                    user.account_type.as_str(),
                    user.marital_status.as_str(),
                    user.biography,
                    user.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
                    Utc::now().to_rfc3339(),
                    user.location.and_then(|l| l.latitude),
                    user.location.and_then(|l| l.longitude),
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                    debug!("Username {} already taken", user.username);
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
            let row = query_user(conn, "id", &id)?
                .ok_or_else(|| anyhow::anyhow!("User {} vanished after insert", id))?;
            Ok(Some(row))
        })
    }

    pub fn get_all_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users u ORDER BY u.joined",
                user_columns("u")
            ))?;
            let rows = stmt
                .query_map([], |row| user_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    /// Applies the fields present in `patch`. Returns the updated row, or
    /// `None` if no user has this id.
    pub fn update_user(&self, id: &str, patch: &UpdateUserRequest) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let location = patch.location;
            let updated = conn.execute(
                "UPDATE users SET
                    first_name     = COALESCE(?2, first_name),
                    last_name      = COALESCE(?3, last_name),
                    email          = COALESCE(?4, email),
                    profile_photo  = COALESCE(?5, profile_photo),
                    header_image   = COALESCE(?6, header_image),
                    account_type   = COALESCE(?7, account_type),
                    marital_status = COALESCE(?8, marital_status),
                    biography      = COALESCE(?9, biography),
                    date_of_birth  = COALESCE(?10, date_of_birth),
                    latitude       = COALESCE(?11, latitude),
                    longitude      = COALESCE(?12, longitude)
                 WHERE id = ?1",
                params![
                    id,
                    patch.first_name,
                    patch.last_name,
                    patch.email,
                    patch.profile_photo,
                    patch.header_image,
                    patch.account_type.map(|a| a.as_str()),
                    patch.marital_status.map(|m| m.as_str()),
                    patch.biography,
                    patch.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()),
                    location.and_then(|l| l.latitude),
                    location.and_then(|l| l.longitude),
                ],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_user(conn, "id", id)
        })
    }

    pub fn delete_user(&self, id: &str) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])?))
    }

    pub fn delete_user_by_username(&self, username: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM users WHERE username = ?1", [username])?)
        })
    }
}

pub(crate) fn user_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// `column` is always a literal from this module, never user input.
fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM users u WHERE u.{} = ?1",
        user_columns("u"),
        column
    ))?;

    let row = stmt.query_row([value], |row| user_at(row, 0)).optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use tuiter_types::models::{AccountType, User};

    use super::*;
    use crate::test_support::{db, user};

    #[test]
    fn username_is_unique() {
        let db = db();
        user(&db, "alice");
        let dup = db.create_user(&NewUser::with_credentials("alice", "other")).unwrap();
        assert!(dup.is_none());
        assert_eq!(db.get_all_users().unwrap().len(), 1);
    }

    #[test]
    fn lookup_by_username_keeps_hash_but_api_model_blanks_it() {
        let db = db();
        let id = user(&db, "alice");

        let row = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.password, "hash");

        let api: User = row.into();
        assert_eq!(api.password, "");
        assert_eq!(api.account_type, AccountType::Personal);
        assert!(api.location.is_none());
    }

    #[test]
    fn partial_update_leaves_other_fields() {
        let db = db();
        let id = user(&db, "alice");

        let patch = UpdateUserRequest {
            biography: Some("hello".into()),
            account_type: Some(AccountType::Academic),
            ..Default::default()
        };
        let row = db.update_user(&id, &patch).unwrap().unwrap();
        assert_eq!(row.biography.as_deref(), Some("hello"));
        assert_eq!(row.account_type, "ACADEMIC");
        assert_eq!(row.username, "alice");

        assert!(db.update_user("missing", &patch).unwrap().is_none());
    }

    #[test]
    fn delete_by_username() {
        let db = db();
        user(&db, "alice");
        assert_eq!(db.delete_user_by_username("alice").unwrap(), 1);
        assert_eq!(db.delete_user_by_username("alice").unwrap(), 0);
        assert!(db.get_all_users().unwrap().is_empty());
    }
}
