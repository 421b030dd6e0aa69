//! Like, dislike and bookmark records. All three share one shape: a
//! (tuit, user) pair, at most one per pair.

use std::collections::HashSet;

use anyhow::Result;
use rusqlite::{Connection, params};

use crate::models::{RelationRow, TuitRow, UserRow, tuit_at, tuit_fields, user_at, user_columns};
use crate::tuits::StatColumn;
use crate::{Database, OptionalExt, new_id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Like,
    Dislike,
    Bookmark,
}

impl Relation {
    pub const ALL: [Relation; 3] = [Relation::Like, Relation::Dislike, Relation::Bookmark];

    pub(crate) fn table(&self) -> &'static str {
        match self {
            Self::Like => "likes",
            Self::Dislike => "dislikes",
            Self::Bookmark => "bookmarks",
        }
    }

    /// The tuit counter kept in step with this relation.
    pub(crate) fn stat(&self) -> StatColumn {
        match self {
            Self::Like => StatColumn::Likes,
            Self::Dislike => StatColumn::Dislikes,
            Self::Bookmark => StatColumn::Bookmarks,
        }
    }
}

impl Database {
    pub fn find_relation(&self, rel: Relation, user_id: &str, tuit_id: &str) -> Result<Option<RelationRow>> {
        self.with_conn(|conn| find_relation(conn, rel, user_id, tuit_id))
    }

    pub fn count_relation(&self, rel: Relation, tuit_id: &str) -> Result<u32> {
        self.with_conn(|conn| count_relation(conn, rel, tuit_id))
    }

    /// Tuits `user_id` holds this relation with, newest record first. Records
    /// whose tuit no longer exists are skipped.
    pub fn get_tuits_for_user(&self, rel: Relation, user_id: &str) -> Result<Vec<TuitRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {}
                 FROM {} r
                 JOIN tuits t ON t.id = r.tuit_id
                 LEFT JOIN users u ON u.id = t.posted_by
                 WHERE r.user_id = ?1
                 ORDER BY r.rowid DESC",
                tuit_fields(),
                rel.table()
            ))?;
            let rows = stmt
                .query_map([user_id], |row| tuit_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Users holding this relation with `tuit_id`. Records whose user no
    /// longer exists are skipped.
    pub fn get_users_for_tuit(&self, rel: Relation, tuit_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {}
                 FROM {} r
                 JOIN users u ON u.id = r.user_id
                 WHERE r.tuit_id = ?1
                 ORDER BY r.rowid",
                user_columns("u"),
                rel.table()
            ))?;
            let rows = stmt
                .query_map([tuit_id], |row| user_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch existence check: which of `tuit_ids` does `user_id` hold this
    /// relation with.
    pub fn related_tuit_ids(
        &self,
        rel: Relation,
        user_id: &str,
        tuit_ids: &[String],
    ) -> Result<HashSet<String>> {
        if tuit_ids.is_empty() {
            return Ok(HashSet::new());
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (2..=tuit_ids.len() + 1).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT tuit_id FROM {} WHERE user_id = ?1 AND tuit_id IN ({})",
                rel.table(),
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut params: Vec<&dyn rusqlite::types::ToSql> = Vec::with_capacity(tuit_ids.len() + 1);
            params.push(&user_id);
            params.extend(tuit_ids.iter().map(|id| id as &dyn rusqlite::types::ToSql));

            let ids = stmt
                .query_map(params.as_slice(), |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;

            Ok(ids)
        })
    }

    /// Removes every record of this relation pointing at `tuit_id`.
    pub fn delete_relations_for_tuit(&self, rel: Relation, tuit_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(&format!("DELETE FROM {} WHERE tuit_id = ?1", rel.table()), [tuit_id])?)
        })
    }
}

pub(crate) fn find_relation(
    conn: &Connection,
    rel: Relation,
    user_id: &str,
    tuit_id: &str,
) -> Result<Option<RelationRow>> {
    let row = conn
        .query_row(
            &format!("SELECT id, tuit_id, user_id FROM {} WHERE tuit_id = ?1 AND user_id = ?2", rel.table()),
            params![tuit_id, user_id],
            |row| {
                Ok(RelationRow {
                    id: row.get(0)?,
                    tuit_id: row.get(1)?,
                    user_id: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub(crate) fn count_relation(conn: &Connection, rel: Relation, tuit_id: &str) -> Result<u32> {
    let count: u32 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE tuit_id = ?1", rel.table()),
        [tuit_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub(crate) fn insert_relation(conn: &Connection, rel: Relation, user_id: &str, tuit_id: &str) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO {} (id, tuit_id, user_id) VALUES (?1, ?2, ?3)", rel.table()),
        params![new_id(), tuit_id, user_id],
    )?;
    Ok(())
}

pub(crate) fn delete_relation(conn: &Connection, rel: Relation, user_id: &str, tuit_id: &str) -> Result<usize> {
    Ok(conn.execute(
        &format!("DELETE FROM {} WHERE tuit_id = ?1 AND user_id = ?2", rel.table()),
        params![tuit_id, user_id],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{db, tuit, user};

    #[test]
    fn batch_lookup_matches_point_lookups() {
        let db = db();
        let alice = user(&db, "alice");
        let t1 = tuit(&db, &alice, "one");
        let t2 = tuit(&db, &alice, "two");
        let t3 = tuit(&db, &alice, "three");

        db.with_conn(|conn| {
            insert_relation(conn, Relation::Like, &alice, &t1)?;
            insert_relation(conn, Relation::Like, &alice, &t3)?;
            insert_relation(conn, Relation::Bookmark, &alice, &t2)
        })
        .unwrap();

        let ids = vec![t1.clone(), t2.clone(), t3.clone()];
        let liked = db.related_tuit_ids(Relation::Like, &alice, &ids).unwrap();
        for id in &ids {
            let point = db.find_relation(Relation::Like, &alice, id).unwrap().is_some();
            assert_eq!(liked.contains(id), point);
        }
        assert_eq!(liked.len(), 2);
        assert!(db.related_tuit_ids(Relation::Dislike, &alice, &ids).unwrap().is_empty());
        assert!(db.related_tuit_ids(Relation::Like, &alice, &[]).unwrap().is_empty());
    }

    #[test]
    fn pair_is_unique() {
        let db = db();
        let alice = user(&db, "alice");
        let t1 = tuit(&db, &alice, "one");

        db.with_conn(|conn| insert_relation(conn, Relation::Dislike, &alice, &t1)).unwrap();
        let dup = db.with_conn(|conn| insert_relation(conn, Relation::Dislike, &alice, &t1));
        assert!(dup.is_err());
        assert_eq!(db.count_relation(Relation::Dislike, &t1).unwrap(), 1);
    }

    #[test]
    fn listings_skip_dangling_records() {
        let db = db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let kept = tuit(&db, &alice, "kept");
        let gone = tuit(&db, &alice, "gone");

        db.with_conn(|conn| {
            insert_relation(conn, Relation::Bookmark, &bob, &kept)?;
            insert_relation(conn, Relation::Bookmark, &bob, &gone)?;
            insert_relation(conn, Relation::Bookmark, &alice, &kept)
        })
        .unwrap();
        db.delete_tuit(&gone).unwrap();
        db.delete_user(&alice).unwrap();

        let tuits = db.get_tuits_for_user(Relation::Bookmark, &bob).unwrap();
        assert_eq!(tuits.len(), 1);
        assert_eq!(tuits[0].id, kept);

        let users = db.get_users_for_tuit(Relation::Bookmark, &kept).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "bob");
    }
}
