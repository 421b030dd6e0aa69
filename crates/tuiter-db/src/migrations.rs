use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                username        TEXT NOT NULL UNIQUE,
                password        TEXT NOT NULL,
                first_name      TEXT,
                last_name       TEXT,
                email           TEXT,
                profile_photo   TEXT,
                header_image    TEXT,
                account_type    TEXT NOT NULL DEFAULT 'PERSONAL',
                marital_status  TEXT NOT NULL DEFAULT 'SINGLE',
                biography       TEXT,
                date_of_birth   TEXT,
                joined          TEXT NOT NULL,
                latitude        REAL,
                longitude       REAL
            );

            CREATE TABLE tuits (
                id          TEXT PRIMARY KEY,
                tuit        TEXT NOT NULL,
                tag         TEXT NOT NULL DEFAULT '',
                posted_on   TEXT NOT NULL,
                posted_by   TEXT NOT NULL,
                replies     INTEGER NOT NULL DEFAULT 0,
                retuits     INTEGER NOT NULL DEFAULT 0,
                likes       INTEGER NOT NULL DEFAULT 0,
                dislikes    INTEGER NOT NULL DEFAULT 0,
                bookmarks   INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_tuits_posted_by ON tuits(posted_by, posted_on);

            CREATE TABLE likes (
                id          TEXT PRIMARY KEY,
                tuit_id     TEXT NOT NULL,
                user_id     TEXT NOT NULL,
                UNIQUE(tuit_id, user_id)
            );

            CREATE TABLE dislikes (
                id          TEXT PRIMARY KEY,
                tuit_id     TEXT NOT NULL,
                user_id     TEXT NOT NULL,
                UNIQUE(tuit_id, user_id)
            );

            CREATE TABLE bookmarks (
                id          TEXT PRIMARY KEY,
                tuit_id     TEXT NOT NULL,
                user_id     TEXT NOT NULL,
                UNIQUE(tuit_id, user_id)
            );

            CREATE INDEX idx_likes_user ON likes(user_id);
            CREATE INDEX idx_dislikes_user ON dislikes(user_id);
            CREATE INDEX idx_bookmarks_user ON bookmarks(user_id);

            CREATE TABLE follows (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL,
                follower_id TEXT NOT NULL,
                UNIQUE(user_id, follower_id)
            );

            CREATE INDEX idx_follows_follower ON follows(follower_id);

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                message     TEXT NOT NULL,
                sent_from   TEXT NOT NULL,
                sent_to     TEXT NOT NULL,
                sent_on     TEXT NOT NULL
            );

            CREATE INDEX idx_messages_from ON messages(sent_from, sent_on);
            CREATE INDEX idx_messages_to ON messages(sent_to, sent_on);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
