//! Conversation threading engine.
//!
//! Groups comments into threads and produces the two flattened timeline
//! orderings the conversation view can toggle between. Grouping merges two
//! channels: reply references (transitively) and the (path, line, side)
//! anchor key. A map-based merge is enough at the volumes a single PR sees.

use crate::models::{
    CommentRecord, ConversationThread, ReviewEvent, ThreadAnchor, ThreadKind, TimelineItem,
    MAIN_CONVERSATION_ID,
};
use std::collections::HashMap;

/// Whether the author login follows the platform's bot naming convention.
///
/// Bot items stay in threads and raw totals but are excluded from the
/// display orderings.
pub fn is_bot(author_id: &str) -> bool {
    author_id.ends_with("[bot]")
}

/// Group inline comments into anchored conversations, in input order.
///
/// A reply joins the group owning its referenced comment, regardless of its
/// own anchor; other comments join or create the group for their anchor key.
fn group_inline_comments<'a>(
    comments: &'a [CommentRecord],
    include_bots: bool,
) -> Vec<(ThreadAnchor, Vec<&'a CommentRecord>)> {
    let mut groups: Vec<(ThreadAnchor, Vec<&CommentRecord>)> = Vec::new();
    let mut group_by_comment_id: HashMap<i64, usize> = HashMap::new();
    let mut group_by_anchor: HashMap<ThreadAnchor, usize> = HashMap::new();

    for comment in comments {
        if !comment.is_inline() {
            continue;
        }
        if !include_bots && is_bot(&comment.author_id) {
            continue;
        }

        let mut target = comment
            .in_reply_to_id
            .and_then(|parent| group_by_comment_id.get(&parent).copied());

        if target.is_none() {
            if let Some(anchor) = comment.anchor() {
                let idx = *group_by_anchor.entry(anchor.clone()).or_insert_with(|| {
                    groups.push((anchor, Vec::new()));
                    groups.len() - 1
                });
                target = Some(idx);
            }
        }

        let Some(idx) = target else { continue };
        groups[idx].1.push(comment);
        group_by_comment_id.insert(comment.id, idx);
    }

    groups
}

/// The comment/verdict union both orderings flatten: every comment plus
/// every review submission that carries body text.
pub fn timeline_items(comments: &[CommentRecord], reviews: &[ReviewEvent]) -> Vec<TimelineItem> {
    let mut items: Vec<TimelineItem> = comments
        .iter()
        .cloned()
        .map(TimelineItem::Comment)
        .collect();
    items.extend(
        reviews
            .iter()
            .filter(|r| r.has_body())
            .cloned()
            .map(TimelineItem::Review),
    );
    items
}

/// Build the conversation threads for one pull request.
///
/// Every inline comment lands in exactly one review thread; general
/// comments and body-bearing review verdicts land in the single synthetic
/// general thread. Within a thread, storage order is oldest-first.
pub fn build_threads(
    comments: &[CommentRecord],
    reviews: &[ReviewEvent],
) -> Vec<ConversationThread> {
    let mut threads = Vec::new();

    // The general discussion thread comes first when it has content.
    let mut general_items: Vec<TimelineItem> = comments
        .iter()
        .filter(|c| !c.is_inline())
        .cloned()
        .map(TimelineItem::Comment)
        .collect();
    general_items.extend(
        reviews
            .iter()
            .filter(|r| r.has_body())
            .cloned()
            .map(TimelineItem::Review),
    );
    if !general_items.is_empty() {
        threads.push(finish_thread(
            MAIN_CONVERSATION_ID.to_string(),
            ThreadKind::GeneralThread,
            None,
            general_items,
        ));
    }

    let mut review_threads: Vec<ConversationThread> = group_inline_comments(comments, true)
        .into_iter()
        .map(|(anchor, members)| {
            let items = members
                .into_iter()
                .cloned()
                .map(TimelineItem::Comment)
                .collect();
            finish_thread(
                anchor.thread_id(),
                ThreadKind::ReviewThread,
                Some(anchor),
                items,
            )
        })
        .collect();
    review_threads.sort_by_key(ConversationThread::started_at);
    threads.extend(review_threads);

    threads
}

fn finish_thread(
    id: String,
    kind: ThreadKind,
    anchor: Option<ThreadAnchor>,
    mut items: Vec<TimelineItem>,
) -> ConversationThread {
    items.sort_by_key(TimelineItem::timestamp);
    let updated_at = items
        .iter()
        .map(TimelineItem::last_touched_at)
        .max()
        .unwrap_or(0);
    ConversationThread {
        id,
        kind,
        anchor,
        items,
        updated_at,
    }
}

/// Flatten all items newest-first.
pub fn order_by_recency(comments: &[CommentRecord], reviews: &[ReviewEvent]) -> Vec<TimelineItem> {
    let mut items: Vec<TimelineItem> = timeline_items(comments, reviews)
        .into_iter()
        .filter(|item| !is_bot(item.author_id()))
        .collect();
    items.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    items
}

/// Flatten in the default grouped presentation.
///
/// Inline comments are grouped by the same key as thread grouping and kept
/// together; groups and standalone items are ordered ascending by their
/// last activity (newest member time, or own time), with each group's
/// members emitted oldest-first at the group's position.
pub fn order_default(comments: &[CommentRecord], reviews: &[ReviewEvent]) -> Vec<TimelineItem> {
    struct Bucket {
        last_activity: i64,
        items: Vec<TimelineItem>,
    }

    let mut buckets: Vec<Bucket> = group_inline_comments(comments, false)
        .into_iter()
        .map(|(_, members)| {
            let mut items: Vec<TimelineItem> = members
                .into_iter()
                .cloned()
                .map(TimelineItem::Comment)
                .collect();
            items.sort_by_key(TimelineItem::timestamp);
            let last_activity = items
                .iter()
                .map(TimelineItem::timestamp)
                .max()
                .unwrap_or(0);
            Bucket {
                last_activity,
                items,
            }
        })
        .collect();

    for comment in comments.iter().filter(|c| !c.is_inline()) {
        if is_bot(&comment.author_id) {
            continue;
        }
        buckets.push(Bucket {
            last_activity: comment.created_at,
            items: vec![TimelineItem::Comment(comment.clone())],
        });
    }
    for review in reviews.iter().filter(|r| r.has_body()) {
        if is_bot(&review.reviewer_id) {
            continue;
        }
        buckets.push(Bucket {
            last_activity: review.submitted_at,
            items: vec![TimelineItem::Review(review.clone())],
        });
    }

    buckets.sort_by_key(|b| b.last_activity);
    buckets.into_iter().flat_map(|b| b.items).collect()
}
