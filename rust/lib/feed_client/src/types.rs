//! Wire types shared by the gateway and the feed controller.
//!
//! Field names follow the backend's snake_case JSON. Kind-specific fields the
//! client does not interpret are preserved in `data` / `extra` so a payload
//! can be sent back unchanged (see `update_session`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParseEnumError;

// ── Activity identity ───────────────────────────────────────────────

/// Kind of activity shown in a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Session,
    Readiness,
    Rest,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Session => "session",
            ActivityKind::Readiness => "readiness",
            ActivityKind::Rest => "rest",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(ActivityKind::Session),
            "readiness" => Ok(ActivityKind::Readiness),
            "rest" => Ok(ActivityKind::Rest),
            other => Err(ParseEnumError::new("activity type", other)),
        }
    }
}

/// `(type, id)` pair. Unique within one feed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivityKey {
    pub kind: ActivityKind,
    pub id: i64,
}

impl ActivityKey {
    pub fn new(kind: ActivityKind, id: i64) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for ActivityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// ── Visibility ──────────────────────────────────────────────────────

/// Who can see a training session and how much of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityLevel {
    Private,
    Attendance,
    Summary,
    Full,
}

impl VisibilityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityLevel::Private => "private",
            VisibilityLevel::Attendance => "attendance",
            VisibilityLevel::Summary => "summary",
            VisibilityLevel::Full => "full",
        }
    }
}

impl fmt::Display for VisibilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisibilityLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(VisibilityLevel::Private),
            "attendance" => Ok(VisibilityLevel::Attendance),
            "summary" => Ok(VisibilityLevel::Summary),
            "full" => Ok(VisibilityLevel::Full),
            other => Err(ParseEnumError::new("visibility level", other)),
        }
    }
}

// ── Feed ────────────────────────────────────────────────────────────

/// A single activity rendered in a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Kind-specific payload (a session record for `session` items).
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub has_liked: bool,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub comment_count: u32,
    /// Everything else the server sent (author, owner flags, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeedItem {
    pub fn key(&self) -> ActivityKey {
        ActivityKey::new(self.kind, self.id)
    }

    /// Mark as liked by the viewer.
    pub fn like(&mut self) {
        self.has_liked = true;
        self.like_count += 1;
    }

    /// Clear the viewer's like. The count never goes below zero.
    pub fn unlike(&mut self) {
        self.has_liked = false;
        self.like_count = self.like_count.saturating_sub(1);
    }

    /// Current `visibility_level` of the session payload, if it parses.
    pub fn visibility(&self) -> Option<VisibilityLevel> {
        self.data
            .get("visibility_level")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }

    pub fn set_visibility(&mut self, level: VisibilityLevel) {
        self.data.insert(
            "visibility_level".to_string(),
            Value::String(level.as_str().to_string()),
        );
    }
}

/// One page of feed results, as returned by the feed endpoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedPage {
    #[serde(default)]
    pub items: Vec<FeedItem>,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(rename = "has_more", default, skip_serializing_if = "Option::is_none")]
    pub server_has_more: Option<bool>,
}

impl FeedPage {
    /// Whether another page exists. Prefers the server's answer.
    pub fn has_more(&self) -> bool {
        self.server_has_more
            .unwrap_or(self.items.len() < self.total)
    }

    pub fn find(&self, key: ActivityKey) -> Option<&FeedItem> {
        self.items.iter().find(|item| item.key() == key)
    }

    pub fn find_mut(&mut self, key: ActivityKey) -> Option<&mut FeedItem> {
        self.items.iter_mut().find(|item| item.key() == key)
    }

    /// Remove the item with `key`, decrementing `total`.
    pub fn remove(&mut self, key: ActivityKey) -> Option<FeedItem> {
        let pos = self.items.iter().position(|item| item.key() == key)?;
        self.total = self.total.saturating_sub(1);
        Some(self.items.remove(pos))
    }

    /// Append the next page. Existing items keep their order; pagination
    /// metadata is taken from `next`.
    pub fn append(&mut self, next: FeedPage) {
        self.items.extend(next.items);
        self.total = next.total;
        self.limit = next.limit;
        self.offset = next.offset;
        self.server_has_more = next.server_has_more;
    }
}

// ── Requests ────────────────────────────────────────────────────────

/// Query string for the feed endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedQuery {
    pub limit: usize,
    #[serde(skip_serializing_if = "is_zero")]
    pub offset: usize,
    pub days_back: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrich_social: Option<bool>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// Body of like / unlike calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeRequest {
    pub activity_type: ActivityKind,
    pub activity_id: i64,
}

impl From<ActivityKey> for LikeRequest {
    fn from(key: ActivityKey) -> Self {
        Self {
            activity_type: key.kind,
            activity_id: key.id,
        }
    }
}

/// Body of a new comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub activity_type: ActivityKind,
    pub activity_id: i64,
    pub comment: String,
}

/// A comment as stored by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub activity_type: ActivityKind,
    pub activity_id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub comment: String,
    #[serde(default)]
    pub created_at: Option<String>,
}
