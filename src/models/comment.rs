//! Comment model for PR discussions.

use serde::{Deserialize, Serialize};

/// Where a comment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    /// General discussion comment on the pull request.
    General,
    /// Inline review comment anchored to a file and line.
    Inline,
}

/// Diff side an inline comment is anchored to when none is reported.
pub const DEFAULT_SIDE: &str = "RIGHT";

/// A general or inline comment on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    /// Platform comment ID.
    pub id: i64,

    /// Author's login.
    pub author_id: String,

    /// Creation timestamp (epoch ms).
    pub created_at: i64,

    /// Last-edit timestamp (epoch ms). Defaults to `created_at` when the
    /// platform reports no edit, so edit detection never double-counts.
    pub updated_at: i64,

    /// Comment content (Markdown).
    pub body: String,

    /// General discussion or inline review comment.
    pub kind: CommentKind,

    /// File path (inline comments).
    pub file_path: Option<String>,

    /// Line in the current diff (inline comments).
    pub line: Option<i64>,

    /// Line in the diff the comment was originally left on, kept when the
    /// current line is outdated.
    pub original_line: Option<i64>,

    /// Diff side: `LEFT` or `RIGHT`.
    pub side: Option<String>,

    /// Parent comment ID for replies.
    pub in_reply_to_id: Option<i64>,
}

/// Location key identifying one inline conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadAnchor {
    pub file_path: String,
    pub line: Option<i64>,
    pub side: String,
}

impl ThreadAnchor {
    /// Stable thread identifier derived from the location.
    pub fn thread_id(&self) -> String {
        match self.line {
            Some(line) => format!("{}:{}:{}", self.file_path, line, self.side),
            None => format!("{}:file:{}", self.file_path, self.side),
        }
    }
}

impl CommentRecord {
    /// Check if this is an inline comment.
    pub fn is_inline(&self) -> bool {
        self.kind == CommentKind::Inline
    }

    /// Check if this is a reply to another comment.
    pub fn is_reply(&self) -> bool {
        self.in_reply_to_id.is_some()
    }

    /// Line used for thread grouping: the current line, falling back to the
    /// original line for outdated comments.
    pub fn anchor_line(&self) -> Option<i64> {
        self.line.or(self.original_line)
    }

    /// Grouping key for inline comments. `None` for general comments.
    pub fn anchor(&self) -> Option<ThreadAnchor> {
        if !self.is_inline() {
            return None;
        }
        Some(ThreadAnchor {
            file_path: self.file_path.clone().unwrap_or_default(),
            line: self.anchor_line(),
            side: self
                .side
                .clone()
                .unwrap_or_else(|| DEFAULT_SIDE.to_string()),
        })
    }

    /// Latest timestamp at which this comment changed (creation or edit).
    pub fn last_touched_at(&self) -> i64 {
        self.updated_at.max(self.created_at)
    }
}
