use anyhow::Result;
use rusqlite::{Connection, params};

use crate::models::{FollowRow, USER_COLUMN_COUNT, joined_user_at, user_columns};
use crate::users::user_exists;
use crate::{Database, new_id};

/// Which side of the follow must still exist for a row to be listed.
enum Keep {
    User,
    Follower,
    All,
}

impl Database {
    /// Records that `follower_id` follows `user_id`. Following twice is a
    /// no-op. Returns `None` if either user does not exist.
    pub fn follow(&self, follower_id: &str, user_id: &str) -> Result<Option<FollowRow>> {
        self.with_conn(|conn| {
            if !user_exists(conn, follower_id)? || !user_exists(conn, user_id)? {
                return Ok(None);
            }
            conn.execute(
                "INSERT OR IGNORE INTO follows (id, user_id, follower_id) VALUES (?1, ?2, ?3)",
                params![new_id(), user_id, follower_id],
            )?;
            let rows = query_follows(conn, "f.user_id = ?1 AND f.follower_id = ?2", &[user_id, follower_id], Keep::All)?;
            Ok(rows.into_iter().next())
        })
    }

    pub fn unfollow(&self, follower_id: &str, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM follows WHERE user_id = ?1 AND follower_id = ?2",
                params![user_id, follower_id],
            )?)
        })
    }

    /// Users that `follower_id` follows.
    pub fn get_following(&self, follower_id: &str) -> Result<Vec<FollowRow>> {
        self.with_conn(|conn| query_follows(conn, "f.follower_id = ?1", &[follower_id], Keep::User))
    }

    /// Users following `user_id`.
    pub fn get_followers(&self, user_id: &str) -> Result<Vec<FollowRow>> {
        self.with_conn(|conn| query_follows(conn, "f.user_id = ?1", &[user_id], Keep::Follower))
    }

    pub fn get_all_follows(&self) -> Result<Vec<FollowRow>> {
        self.with_conn(|conn| query_follows(conn, "1 = 1", &[], Keep::All))
    }
}

/// `filter` is always a literal from this module.
fn query_follows(conn: &Connection, filter: &str, args: &[&str], keep: Keep) -> Result<Vec<FollowRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT f.id, f.user_id, f.follower_id, {}, {}
         FROM follows f
         LEFT JOIN users u ON u.id = f.user_id
         LEFT JOIN users fu ON fu.id = f.follower_id
         WHERE {}
         ORDER BY f.rowid",
        user_columns("u"),
        user_columns("fu"),
        filter
    ))?;

    let rows = stmt
        .query_map(rusqlite::params_from_iter(args.iter()), |row| {
            Ok(FollowRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                follower_id: row.get(2)?,
                user: joined_user_at(row, 3)?,
                follower: joined_user_at(row, 3 + USER_COLUMN_COUNT)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .filter(|f| match keep {
            Keep::User => f.user.is_some(),
            Keep::Follower => f.follower.is_some(),
            Keep::All => true,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{db, user};

    #[test]
    fn follow_is_idempotent_and_directional() {
        let db = db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");

        let first = db.follow(&alice, &bob).unwrap().unwrap();
        let second = db.follow(&alice, &bob).unwrap().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(db.get_all_follows().unwrap().len(), 1);

        let following = db.get_following(&alice).unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].user.as_ref().unwrap().username, "bob");

        let followers = db.get_followers(&bob).unwrap();
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0].follower.as_ref().unwrap().username, "alice");

        assert!(db.get_followers(&alice).unwrap().is_empty());
    }

    #[test]
    fn unknown_users_cannot_follow() {
        let db = db();
        let alice = user(&db, "alice");
        assert!(db.follow(&alice, "ghost").unwrap().is_none());
        assert!(db.follow("ghost", &alice).unwrap().is_none());
    }

    #[test]
    fn unfollow_and_dangling_follows() {
        let db = db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let carol = user(&db, "carol");
        db.follow(&alice, &bob).unwrap();
        db.follow(&alice, &carol).unwrap();

        assert_eq!(db.unfollow(&alice, &bob).unwrap(), 1);
        assert_eq!(db.unfollow(&alice, &bob).unwrap(), 0);

        db.delete_user(&carol).unwrap();
        assert!(db.get_following(&alice).unwrap().is_empty());
        assert_eq!(db.get_all_follows().unwrap().len(), 1);
    }
}
