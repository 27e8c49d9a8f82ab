//! Chat and post ledgers: the write/read semantics layered over raw queries.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use tracing::debug;

use lounge_types::models::{AdminIdentity, ChatMessage, Post, UserIdentity};
use lounge_types::text::{CONTENT_MAX_CHARS, TITLE_MAX_CHARS, sanitize};

use crate::Database;
use crate::error::StoreError;

pub const DEFAULT_HISTORY_LIMIT: u32 = 30;
pub const DEFAULT_FEED_LIMIT: u32 = 100;

/// Timestamps are stored the way SQLite's `datetime('now')` writes them,
/// so lexical order equals chronological order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str, row_id: i64) -> Result<DateTime<Utc>> {
    let parsed = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .with_context(|| format!("corrupt created_at '{raw}' on row {row_id}"))?;
    Ok(parsed.and_utc())
}

/// Append-only chat history with a maximum-age retention policy.
///
/// The ledger trusts its caller: session checks happen before `append`.
#[derive(Clone)]
pub struct MessageLedger {
    db: Arc<Database>,
}

impl MessageLedger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Persist a chat line. Blank input (after trimming) is dropped and yields `None`.
    pub fn append(&self, author: &UserIdentity, raw: &str) -> Result<Option<ChatMessage>> {
        self.append_at(author, raw, Utc::now())
    }

    pub fn append_at(
        &self,
        author: &UserIdentity,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ChatMessage>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let body = sanitize(trimmed);
        let stamp = format_timestamp(now);
        let id = self.db.insert_message(author.id, &body, &stamp)?;

        // Re-parse the stored form so live and replayed times agree to the second
        Ok(Some(ChatMessage {
            id,
            author_id: author.id,
            author_username: author.username.clone(),
            body,
            created_at: parse_timestamp(&stamp, id)?,
        }))
    }

    /// The latest `limit` messages, oldest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<ChatMessage>> {
        let mut rows = self.db.get_recent_messages(limit)?;
        rows.reverse();

        rows.into_iter()
            .map(|row| {
                Ok(ChatMessage {
                    created_at: parse_timestamp(&row.created_at, row.id)?,
                    id: row.id,
                    author_id: row.user_id,
                    author_username: row.username,
                    body: row.body,
                })
            })
            .collect()
    }

    /// Delete messages older than `max_age`. Returns how many were removed.
    pub fn sweep_expired(&self, max_age: TimeDelta) -> Result<usize> {
        self.sweep_before(Utc::now() - max_age)
    }

    pub fn sweep_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let deleted = self.db.delete_messages_before(&format_timestamp(cutoff))?;
        if deleted > 0 {
            self.db.vacuum()?;
        }
        debug!("Swept {} messages created before {}", deleted, cutoff);
        Ok(deleted)
    }
}

/// Append-only admin feed. No retention.
#[derive(Clone)]
pub struct PostLedger {
    db: Arc<Database>,
}

impl PostLedger {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn publish(&self, author: &AdminIdentity, title: &str, content: &str) -> Result<Post, StoreError> {
        self.publish_at(author, title, content, Utc::now())
    }

    pub fn publish_at(
        &self,
        author: &AdminIdentity,
        title: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Post, StoreError> {
        let title = title.trim();
        let content = content.trim();

        if title.is_empty() || content.is_empty() {
            return Err(StoreError::Invalid("Title and content required"));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(StoreError::Invalid("Title too long"));
        }
        if content.chars().count() > CONTENT_MAX_CHARS {
            return Err(StoreError::Invalid("Content too long"));
        }

        let title = sanitize(title);
        let content = sanitize(content);
        let stamp = format_timestamp(now);
        let id = self.db.insert_post(&author.name, &title, &content, &stamp)?;

        Ok(Post {
            id,
            author: author.name.clone(),
            title,
            content,
            created_at: parse_timestamp(&stamp, id)?,
        })
    }

    /// The latest `limit` posts, newest first.
    pub fn recent(&self, limit: u32) -> Result<Vec<Post>> {
        self.db
            .get_recent_posts(limit)?
            .into_iter()
            .map(|row| {
                Ok(Post {
                    created_at: parse_timestamp(&row.created_at, row.id)?,
                    id: row.id,
                    author: row.author,
                    title: row.title,
                    content: row.content,
                })
            })
            .collect()
    }
}
