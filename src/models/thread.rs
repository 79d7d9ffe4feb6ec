//! Conversation thread model and the flattened timeline item union.

use crate::models::comment::{CommentRecord, ThreadAnchor};
use crate::models::review::ReviewEvent;
use serde::Serialize;

/// Identifier of the single synthetic general-discussion thread.
pub const MAIN_CONVERSATION_ID: &str = "main-conversation";

/// Kind of conversation thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadKind {
    /// Inline conversation anchored to a file location.
    ReviewThread,
    /// The general discussion thread.
    GeneralThread,
}

/// One item in the flattened conversation timeline: a comment or a
/// body-bearing review verdict.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimelineItem {
    Comment(CommentRecord),
    Review(ReviewEvent),
}

impl TimelineItem {
    /// Creation/submission timestamp (epoch ms).
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Comment(c) => c.created_at,
            Self::Review(r) => r.submitted_at,
        }
    }

    /// Latest change timestamp (epoch ms). Reviews are never edited.
    pub fn last_touched_at(&self) -> i64 {
        match self {
            Self::Comment(c) => c.last_touched_at(),
            Self::Review(r) => r.submitted_at,
        }
    }

    /// Author's login.
    pub fn author_id(&self) -> &str {
        match self {
            Self::Comment(c) => &c.author_id,
            Self::Review(r) => &r.reviewer_id,
        }
    }
}

/// A maximal set of items considered one logical conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationThread {
    /// Stable thread identifier: the anchor location for review threads,
    /// [`MAIN_CONVERSATION_ID`] for the general thread.
    pub id: String,

    pub kind: ThreadKind,

    /// Location key. Present on review threads only.
    pub anchor: Option<ThreadAnchor>,

    /// Member items, oldest-first.
    pub items: Vec<TimelineItem>,

    /// Newest child change timestamp (epoch ms).
    pub updated_at: i64,
}

impl ConversationThread {
    /// Timestamp of the earliest member item, or 0 for an empty thread.
    pub fn started_at(&self) -> i64 {
        self.items.first().map(TimelineItem::timestamp).unwrap_or(0)
    }
}
