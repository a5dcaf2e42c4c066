//! Reddit collection: top posts, comment threads and search results as flat
//! records, paced one record at a time.
//!
//! [`Collector`] is the entry point. It talks to Reddit through the
//! [`reddit::RedditApi`] seam, sleeps through a [`Pacer`] after every record and
//! reports progress to a [`CollectObserver`].
pub mod collector;
pub mod error;
pub mod observer;
pub mod pacing;
pub mod records;
pub mod reddit;

pub use collector::{
    ALL_SUBREDDITS, Collector, DEFAULT_LIMIT, DEFAULT_SEARCH_TIME_FILTER, DEFAULT_TOP_TIME_FILTER,
};
pub use error::CollectError;
pub use observer::{CollectObserver, Operation, TracingObserver};
pub use pacing::{FixedDelay, NoDelay, Pacer};
pub use records::{Comment, DELETED_AUTHOR, Post};
