//! Flat records produced by the collector.
//!
//! Field names are the JSON keys written to disk.
use serde::{Deserialize, Serialize};

/// Author recorded when the account no longer exists or is hidden.
pub const DELETED_AUTHOR: &str = "[deleted]";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub selftext: String,
    pub author: String,
    pub subreddit: String,
    pub score: i64,
    pub upvote_ratio: f64,
    pub num_comments: u64,
    pub created_utc: f64,
    pub url: String,
    pub is_self: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub author: String,
    pub subreddit: String,
    pub score: i64,
    pub created_utc: f64,
    /// Fullname of the parent: `t3_*` for a top-level comment, `t1_*` for a reply.
    pub parent_id: String,
    pub post_id: String,
    pub is_submitter: bool,
}
