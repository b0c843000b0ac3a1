use std::collections::{HashMap, HashSet};

use comments_boundary::{Comment, CommentId};

/// A comment together with its (recursively nested) replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<CommentThread>,
}

impl CommentThread {
    /// Number of comments in this thread, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.replies.iter().map(Self::len).sum::<usize>()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Nests replies below their parents.
///
/// The order of the input is kept on every level. Replies whose parent is
/// not part of the list are shown as top-level comments.
#[must_use]
pub fn build_threads(comments: Vec<Comment>) -> Vec<CommentThread> {
    let ids: HashSet<CommentId> = comments.iter().map(|c| c.id).collect();
    let mut children: HashMap<CommentId, Vec<Comment>> = HashMap::new();
    let mut roots = vec![];
    for comment in comments {
        match comment.parent_comment {
            Some(parent) if parent != comment.id && ids.contains(&parent) => {
                children.entry(parent).or_default().push(comment);
            }
            _ => roots.push(comment),
        }
    }
    let threads = roots
        .into_iter()
        .map(|comment| attach_replies(comment, &mut children))
        .collect();
    if !children.is_empty() {
        let dropped: usize = children.values().map(Vec::len).sum();
        log::warn!("Dropped {dropped} comments with cyclic parents");
    }
    threads
}

fn attach_replies(
    comment: Comment,
    children: &mut HashMap<CommentId, Vec<Comment>>,
) -> CommentThread {
    let replies = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|reply| attach_replies(reply, children))
        .collect();
    CommentThread { comment, replies }
}
