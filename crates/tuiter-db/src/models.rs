//! Database row types. These map directly to SQLite rows and stay distinct
//! from the tuiter-types API models; the `From` impls below do the mapping.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use tracing::warn;

use tuiter_types::api::CreateUserRequest;
use tuiter_types::models::{
    AccountType, Follow, Location, MaritalStatus, Message, Stats, Tuit, User,
};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub profile_photo: Option<String>,
    pub header_image: Option<String>,
    pub account_type: String,
    pub marital_status: String,
    pub biography: Option<String>,
    pub date_of_birth: Option<String>,
    pub joined: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

pub struct TuitRow {
    pub id: String,
    pub tuit: String,
    pub tag: String,
    pub posted_on: String,
    pub posted_by: String,
    pub stats: Stats,
    /// Author joined from `users`; `None` when the id no longer resolves.
    pub author: Option<UserRow>,
}

/// A like, dislike or bookmark record.
pub struct RelationRow {
    pub id: String,
    pub tuit_id: String,
    pub user_id: String,
}

pub struct FollowRow {
    pub id: String,
    pub user_id: String,
    pub follower_id: String,
    pub user: Option<UserRow>,
    pub follower: Option<UserRow>,
}

pub struct MessageRow {
    pub id: String,
    pub message: String,
    pub sent_from: String,
    pub sent_to: String,
    pub sent_on: String,
}

/// Insert payload for `users`. The password is already hashed.
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub profile_photo: Option<String>,
    pub header_image: Option<String>,
    pub account_type: AccountType,
    pub marital_status: MaritalStatus,
    pub biography: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub location: Option<Location>,
}

impl NewUser {
    pub fn from_request(req: CreateUserRequest, password_hash: String) -> Self {
        Self {
            username: req.username,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            profile_photo: req.profile_photo,
            header_image: req.header_image,
            account_type: req.account_type,
            marital_status: req.marital_status,
            biography: req.biography,
            date_of_birth: req.date_of_birth,
            location: req.location,
        }
    }

    pub fn with_credentials(username: &str, password_hash: &str) -> Self {
        Self {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            first_name: None,
            last_name: None,
            email: None,
            profile_photo: None,
            header_image: None,
            account_type: AccountType::default(),
            marital_status: MaritalStatus::default(),
            biography: None,
            date_of_birth: None,
            location: None,
        }
    }
}

// -- Column lists and row readers --

pub(crate) const USER_COLUMN_COUNT: usize = 15;

/// The `users` column list under table alias `alias`, in the order
/// `user_at` reads them.
pub(crate) fn user_columns(alias: &str) -> String {
    [
        "id", "username", "password", "first_name", "last_name", "email",
        "profile_photo", "header_image", "account_type", "marital_status",
        "biography", "date_of_birth", "joined", "latitude", "longitude",
    ]
    .iter()
    .map(|c| format!("{alias}.{c}"))
    .collect::<Vec<_>>()
    .join(", ")
}

pub(crate) fn user_at(row: &Row<'_>, at: usize) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(at)?,
        username: row.get(at + 1)?,
        password: row.get(at + 2)?,
        first_name: row.get(at + 3)?,
        last_name: row.get(at + 4)?,
        email: row.get(at + 5)?,
        profile_photo: row.get(at + 6)?,
        header_image: row.get(at + 7)?,
        account_type: row.get(at + 8)?,
        marital_status: row.get(at + 9)?,
        biography: row.get(at + 10)?,
        date_of_birth: row.get(at + 11)?,
        joined: row.get(at + 12)?,
        latitude: row.get(at + 13)?,
        longitude: row.get(at + 14)?,
    })
}

/// Reads a LEFT JOINed user, `None` when the join found no row.
pub(crate) fn joined_user_at(row: &Row<'_>, at: usize) -> rusqlite::Result<Option<UserRow>> {
    match row.get::<_, Option<String>>(at)? {
        Some(_) => user_at(row, at).map(Some),
        None => Ok(None),
    }
}

pub(crate) const TUIT_COLUMN_COUNT: usize = 10;

/// Select list read by `tuit_at`: tuit `t` followed by its author `u`.
pub(crate) fn tuit_fields() -> String {
    format!(
        "t.id, t.tuit, t.tag, t.posted_on, t.posted_by,
         t.replies, t.retuits, t.likes, t.dislikes, t.bookmarks, {}",
        user_columns("u")
    )
}

pub(crate) fn tuit_select() -> String {
    format!(
        "SELECT {} FROM tuits t LEFT JOIN users u ON u.id = t.posted_by",
        tuit_fields()
    )
}

pub(crate) fn tuit_at(row: &Row<'_>, at: usize) -> rusqlite::Result<TuitRow> {
    Ok(TuitRow {
        id: row.get(at)?,
        tuit: row.get(at + 1)?,
        tag: row.get(at + 2)?,
        posted_on: row.get(at + 3)?,
        posted_by: row.get(at + 4)?,
        stats: Stats {
            replies: row.get(at + 5)?,
            retuits: row.get(at + 6)?,
            likes: row.get(at + 7)?,
            dislikes: row.get(at + 8)?,
            bookmarks: row.get(at + 9)?,
        },
        author: joined_user_at(row, at + TUIT_COLUMN_COUNT)?,
    })
}

// -- Conversions to API models --

/// SQLite text timestamps are RFC 3339 when written by this crate; older rows
/// written by `datetime('now')` lack the timezone and are read as UTC.
pub(crate) fn parse_timestamp(raw: &str, what: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, what, e);
            DateTime::default()
        })
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let account_type = row.account_type.parse().unwrap_or_else(|e| {
            warn!("User {}: {}", row.id, e);
            AccountType::default()
        });
        let marital_status = row.marital_status.parse().unwrap_or_else(|e| {
            warn!("User {}: {}", row.id, e);
            MaritalStatus::default()
        });
        let date_of_birth = row
            .date_of_birth
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        let location = match (row.latitude, row.longitude) {
            (None, None) => None,
            (latitude, longitude) => Some(Location { latitude, longitude }),
        };

        User {
            joined: parse_timestamp(&row.joined, &format!("user '{}'", row.id)),
            id: row.id,
            username: row.username,
            password: String::new(),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            profile_photo: row.profile_photo,
            header_image: row.header_image,
            account_type,
            marital_status,
            biography: row.biography,
            date_of_birth,
            location,
        }
    }
}

impl From<TuitRow> for Tuit {
    fn from(row: TuitRow) -> Self {
        Tuit {
            posted_on: parse_timestamp(&row.posted_on, &format!("tuit '{}'", row.id)),
            id: row.id,
            tuit: row.tuit,
            tag: row.tag,
            posted_by: row.author.map(User::from),
            stats: row.stats,
            is_liked: None,
            is_disliked: None,
            is_bookmarked: None,
        }
    }
}

impl From<FollowRow> for Follow {
    fn from(row: FollowRow) -> Self {
        Follow {
            id: row.id,
            user_id: row.user_id,
            follower_id: row.follower_id,
            user: row.user.map(User::from),
            follower: row.follower.map(User::from),
        }
    }
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            sent_on: parse_timestamp(&row.sent_on, &format!("message '{}'", row.id)),
            id: row.id,
            message: row.message,
            sent_from: row.sent_from,
            sent_to: row.sent_to,
        }
    }
}
