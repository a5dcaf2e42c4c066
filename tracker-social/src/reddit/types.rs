//! Wire models for the Reddit OAuth API.
//!
//! Listings wrap "things" tagged by kind: `t3` submissions, `t1` comments and
//! `more` placeholders standing in for collapsed replies.
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub children: Vec<Thing>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum Thing {
    #[serde(rename = "t3")]
    Submission(Box<Submission>),
    #[serde(rename = "t1")]
    Comment(Box<RawComment>),
    #[serde(rename = "more")]
    More(MoreChildren),
}

impl Thing {
    /// Fullname of the post or comment this thing hangs under.
    pub fn parent_id(&self) -> Option<&str> {
        match self {
            Thing::Submission(_) => None,
            Thing::Comment(c) => Some(&c.parent_id),
            Thing::More(m) => Some(&m.parent_id),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub upvote_ratio: Option<f64>,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub is_self: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawComment {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub link_id: String,
    #[serde(default)]
    pub is_submitter: bool,
    /// Nested replies; Reddit sends `""` instead of a listing when there are none.
    #[serde(default, deserialize_with = "deserialize_replies")]
    pub replies: Vec<Thing>,
}

impl RawComment {
    pub fn fullname(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("t1_{}", self.id),
        }
    }
}

/// A "load more comments" placeholder.
///
/// Regular placeholders list the ids to fetch through `/api/morechildren`. A
/// "continue this thread" placeholder has no ids (and id `_`); its replies are
/// loaded by opening the parent comment's own thread.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoreChildren {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub depth: u32,
    #[serde(default)]
    pub children: Vec<String>,
}

impl MoreChildren {
    pub fn is_continue_thread(&self) -> bool {
        self.children.is_empty() && self.parent_id.starts_with("t1_")
    }

    /// Identity used to avoid expanding the same placeholder twice.
    pub fn key(&self) -> (String, String) {
        (self.id.clone(), self.parent_id.clone())
    }
}

fn deserialize_replies<'de, D>(d: D) -> Result<Vec<Thing>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Listing(Listing),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Wire::deserialize(d)? {
        Wire::Listing(listing) => listing.data.children,
        Wire::Other(_) => Vec::new(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoreChildrenResponse {
    pub json: MoreChildrenJson,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoreChildrenJson {
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
    #[serde(default)]
    pub data: Option<MoreChildrenData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoreChildrenData {
    #[serde(default)]
    pub things: Vec<Thing>,
}

/// Response of the application-only OAuth grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Result of the identity check performed when a collector connects.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Identity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl Identity {
    /// Identity of an application-only token, which has no user behind it.
    pub fn application() -> Self {
        Self::default()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<application>")
    }
}
