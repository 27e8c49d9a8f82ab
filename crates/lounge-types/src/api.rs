use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, Post, UserIdentity};

// -- Generic bodies --

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Accounts --

/// Fields are optional so that a missing field is reported as a validation
/// failure instead of a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub confirm: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: Option<UserIdentity>,
}

// -- Chat history --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageEntry {
    pub user: String,
    pub msg: String,
    pub time: DateTime<Utc>,
}

impl From<ChatMessage> for MessageEntry {
    fn from(m: ChatMessage) -> Self {
        Self {
            user: m.author_username,
            msg: m.body,
            time: m.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageEntry>,
}

// -- Admin & posts --

#[derive(Debug, Default, Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub phasekey: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostEntry {
    pub id: i64,
    pub author: String,
    pub title: String,
    pub content: String,
    pub time: DateTime<Utc>,
}

impl From<Post> for PostEntry {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            author: p.author,
            title: p.title,
            content: p.content,
            time: p.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostsResponse {
    pub posts: Vec<PostEntry>,
}
