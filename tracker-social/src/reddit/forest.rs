//! Comment trees and "load more comments" expansion.
//!
//! A freshly fetched tree contains [`CommentNode::More`] placeholders. After
//! [`CommentForest::replace_more`] none remain, and [`CommentForest::flatten`]
//! walks the comments breadth first: every top-level comment, then their
//! replies, and so on.
use std::collections::{HashSet, VecDeque};

use super::api::{ApiError, RedditApi};
use super::types::{MoreChildren, RawComment, Thing};

#[derive(Debug, Clone)]
pub enum CommentNode {
    Comment {
        comment: Box<RawComment>,
        replies: Vec<CommentNode>,
    },
    More(MoreChildren),
}

impl CommentNode {
    /// Convert a wire thing (and its nested replies). Submissions are not comment nodes.
    pub fn from_thing(thing: Thing) -> Option<Self> {
        match thing {
            Thing::Submission(_) => None,
            Thing::More(more) => Some(CommentNode::More(more)),
            Thing::Comment(mut comment) => {
                let replies = std::mem::take(&mut comment.replies)
                    .into_iter()
                    .filter_map(CommentNode::from_thing)
                    .collect();
                Some(CommentNode::Comment { comment, replies })
            }
        }
    }

    fn parent_id(&self) -> &str {
        match self {
            CommentNode::Comment { comment, .. } => &comment.parent_id,
            CommentNode::More(more) => &more.parent_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommentForest {
    link_id: String,
    nodes: Vec<CommentNode>,
}

impl CommentForest {
    /// `link_id` is the post's fullname (`t3_...`); a bare id is prefixed.
    pub fn new(link_id: &str, things: Vec<Thing>) -> Self {
        let link_id = if link_id.starts_with("t3_") {
            link_id.to_string()
        } else {
            format!("t3_{link_id}")
        };
        Self {
            link_id,
            nodes: things.into_iter().filter_map(CommentNode::from_thing).collect(),
        }
    }

    pub fn link_id(&self) -> &str {
        &self.link_id
    }

    pub fn nodes(&self) -> &[CommentNode] {
        &self.nodes
    }

    pub fn placeholder_count(&self) -> usize {
        fn count(nodes: &[CommentNode]) -> usize {
            nodes
                .iter()
                .map(|n| match n {
                    CommentNode::More(_) => 1,
                    CommentNode::Comment { replies, .. } => count(replies),
                })
                .sum()
        }
        count(&self.nodes)
    }

    /// Expand every placeholder in place until none remain.
    ///
    /// A placeholder seen a second time is dropped instead of expanded again, so
    /// this terminates even if the server keeps handing back the same one.
    /// Returns the number of expansion calls made.
    pub async fn replace_more(&mut self, api: &dyn RedditApi) -> Result<usize, ApiError> {
        let mut seen = HashSet::new();
        let mut calls = 0usize;

        while let Some(path) = first_more(&self.nodes) {
            let Some((&idx, parent_path)) = path.split_last() else {
                break;
            };
            let more = match siblings_at(&mut self.nodes, parent_path) {
                Some(siblings) => match siblings.remove(idx) {
                    CommentNode::More(more) => more,
                    CommentNode::Comment { .. } => {
                        return Err(ApiError::Unexpected("placeholder path out of sync".into()));
                    }
                },
                None => return Err(ApiError::Unexpected("placeholder path out of sync".into())),
            };

            if !seen.insert(more.key()) {
                tracing::debug!(id = %more.id, parent = %more.parent_id, "reddit.more.duplicate");
                continue;
            }
            if more.children.is_empty() && !more.is_continue_thread() {
                continue;
            }

            let things = api.expand_more(&self.link_id, &more).await?;
            calls += 1;
            tracing::debug!(
                id = %more.id,
                parent = %more.parent_id,
                requested = more.children.len(),
                returned = things.len(),
                "reddit.more.expanded"
            );

            let fresh = assemble(&more.parent_id, things);
            if let Some(siblings) = siblings_at(&mut self.nodes, parent_path) {
                siblings.splice(idx..idx, fresh);
            }
        }

        Ok(calls)
    }

    /// Comments in breadth-first order. Placeholders are never yielded.
    pub fn flatten(self) -> Vec<RawComment> {
        let mut queue: VecDeque<CommentNode> = self.nodes.into();
        let mut out = Vec::new();
        while let Some(node) = queue.pop_front() {
            if let CommentNode::Comment { comment, replies } = node {
                out.push(*comment);
                queue.extend(replies);
            }
        }
        out
    }
}

/// Path (child indices from the root) to the first placeholder, depth first.
fn first_more(nodes: &[CommentNode]) -> Option<Vec<usize>> {
    for (i, node) in nodes.iter().enumerate() {
        match node {
            CommentNode::More(_) => return Some(vec![i]),
            CommentNode::Comment { replies, .. } => {
                if let Some(mut path) = first_more(replies) {
                    path.insert(0, i);
                    return Some(path);
                }
            }
        }
    }
    None
}

fn siblings_at<'a>(
    mut nodes: &'a mut Vec<CommentNode>,
    path: &[usize],
) -> Option<&'a mut Vec<CommentNode>> {
    for &i in path {
        nodes = match nodes.get_mut(i)? {
            CommentNode::Comment { replies, .. } => replies,
            CommentNode::More(_) => return None,
        };
    }
    Some(nodes)
}

fn replies_of<'a>(nodes: &'a mut [CommentNode], fullname: &str) -> Option<&'a mut Vec<CommentNode>> {
    for node in nodes.iter_mut() {
        if let CommentNode::Comment { comment, replies } = node {
            if comment.fullname() == fullname {
                return Some(replies);
            }
            if let Some(found) = replies_of(replies, fullname) {
                return Some(found);
            }
        }
    }
    None
}

/// Rebuild the subtree that replaces a placeholder under `anchor`.
///
/// Things whose parent is `anchor` take the placeholder's position, in order;
/// the rest attach under whichever returned comment is their parent. Orphans
/// stay at the anchor level rather than being lost.
fn assemble(anchor: &str, things: Vec<Thing>) -> Vec<CommentNode> {
    let mut top: Vec<CommentNode> = Vec::new();
    for node in things.into_iter().filter_map(CommentNode::from_thing) {
        let parent = node.parent_id().to_string();
        if parent != anchor {
            if let Some(replies) = replies_of(&mut top, &parent) {
                replies.push(node);
                continue;
            }
        }
        top.push(node);
    }
    top
}
