use anyhow::{Result, bail};
use rusqlite::Connection;
use tracing::debug;

use crate::Database;
use crate::relations::{Relation, count_relation, delete_relation, find_relation, insert_relation};
use crate::tuits::{set_stat, tuit_exists};
use crate::users::user_exists;

/// Outcome of a relation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggled {
    /// Whether the user holds the relation afterwards.
    pub present: bool,
    /// `false` when the record was already in the requested state.
    pub changed: bool,
    /// Counter value written to the tuit's stats.
    pub count: u32,
    /// Set when turning a dislike on removed the actor's like.
    pub cleared_like: bool,
}

/// Requested end state for a relation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Flip,
    Set,
    Clear,
}

impl Database {
    /// Flips `user_id`'s membership in `rel` for `tuit_id` and rewrites the
    /// matching counter on the tuit.
    ///
    /// The check, count, write and counter update run in one transaction on
    /// the single writer connection, so concurrent toggles are serialized and
    /// a failure part-way leaves nothing behind. Turning a dislike on also
    /// removes the same user's like. Turning a like on leaves a dislike alone.
    pub fn toggle(&self, rel: Relation, user_id: &str, tuit_id: &str) -> Result<Toggled> {
        self.with_tx(|tx| apply(tx, rel, user_id, tuit_id, Intent::Flip))
    }

    /// Ensures the record exists. Repeating it changes nothing.
    pub fn set_relation(&self, rel: Relation, user_id: &str, tuit_id: &str) -> Result<Toggled> {
        self.with_tx(|tx| apply(tx, rel, user_id, tuit_id, Intent::Set))
    }

    /// Ensures the record is gone. Repeating it changes nothing.
    pub fn clear_relation(&self, rel: Relation, user_id: &str, tuit_id: &str) -> Result<Toggled> {
        self.with_tx(|tx| apply(tx, rel, user_id, tuit_id, Intent::Clear))
    }
}

fn apply(conn: &Connection, rel: Relation, user_id: &str, tuit_id: &str, intent: Intent) -> Result<Toggled> {
    if !tuit_exists(conn, tuit_id)? {
        bail!("Tuit not found: {}", tuit_id);
    }
    if !user_exists(conn, user_id)? {
        bail!("User not found: {}", user_id);
    }

    let existing = find_relation(conn, rel, user_id, tuit_id)?.is_some();
    let count = count_relation(conn, rel, tuit_id)?;
    let want = match intent {
        Intent::Flip => !existing,
        Intent::Set => true,
        Intent::Clear => false,
    };

    if want == existing {
        return Ok(Toggled { present: existing, changed: false, count, cleared_like: false });
    }

    let toggled = if existing {
        delete_relation(conn, rel, user_id, tuit_id)?;
        Toggled { present: false, changed: true, count: count.saturating_sub(1), cleared_like: false }
    } else {
        insert_relation(conn, rel, user_id, tuit_id)?;
        let mut toggled = Toggled { present: true, changed: true, count: count + 1, cleared_like: false };
        if rel == Relation::Dislike {
            toggled.cleared_like = clear_like(conn, user_id, tuit_id)?;
        }
        toggled
    };

    set_stat(conn, tuit_id, rel.stat(), toggled.count)?;
    debug!(?rel, user_id, tuit_id, present = toggled.present, count = toggled.count, "relation changed");
    Ok(toggled)
}

/// Likes and dislikes are exclusive per user: drop the like and decrement
/// the like counter. Returns whether a like was removed.
fn clear_like(conn: &Connection, user_id: &str, tuit_id: &str) -> Result<bool> {
    if find_relation(conn, Relation::Like, user_id, tuit_id)?.is_none() {
        return Ok(false);
    }
    let likes = count_relation(conn, Relation::Like, tuit_id)?;
    delete_relation(conn, Relation::Like, user_id, tuit_id)?;
    set_stat(conn, tuit_id, Relation::Like.stat(), likes.saturating_sub(1))?;
    Ok(true)
}
