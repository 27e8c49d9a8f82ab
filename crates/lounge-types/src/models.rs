use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A logged-in chat user, as cached inside a session.
///
/// This is a point-in-time copy of the account row; the session authority
/// refreshes `username` when the owner renames themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub username: String,
}

/// An authenticated administrator. Unrelated to any chat account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub name: String,
}

/// A persisted chat line. `body` is already HTML-escaped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// An admin-authored feed entry. `title` and `content` are already HTML-escaped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
