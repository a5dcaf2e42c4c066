//! Normalization of Reddit wire models into flat records.
use crate::records::{Comment, DELETED_AUTHOR, Post};

use super::types::{RawComment, Submission};

fn author_or_sentinel(author: Option<String>) -> String {
    match author {
        Some(a) if !a.trim().is_empty() => a,
        _ => DELETED_AUTHOR.to_string(),
    }
}

pub fn post_from_submission(s: Submission) -> Post {
    Post {
        id: s.id,
        title: s.title,
        selftext: s.selftext,
        author: author_or_sentinel(s.author),
        subreddit: s.subreddit,
        score: s.score,
        upvote_ratio: s
            .upvote_ratio
            .filter(|r| r.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 1.0),
        num_comments: s.num_comments.max(0) as u64,
        created_utc: s.created_utc,
        url: s.url,
        is_self: s.is_self,
    }
}

/// `requested_post_id` backs up a comment whose `link_id` is missing.
pub fn comment_from_raw(c: RawComment, requested_post_id: &str) -> Comment {
    let post_id = match c.link_id.strip_prefix("t3_") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => requested_post_id
            .strip_prefix("t3_")
            .unwrap_or(requested_post_id)
            .to_string(),
    };
    Comment {
        id: c.id,
        body: c.body,
        author: author_or_sentinel(c.author),
        subreddit: c.subreddit,
        score: c.score,
        created_utc: c.created_utc,
        parent_id: c.parent_id,
        post_id,
        is_submitter: c.is_submitter,
    }
}
