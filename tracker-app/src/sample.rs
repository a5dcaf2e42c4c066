//! Sample collection: top posts from a handful of communities, saved as one
//! timestamped JSON file.
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracker_common::{Result, TrackerError};
use tracker_config::SampleConfig;
use tracker_social::{Collector, Post};

pub async fn collect_sample(collector: &Collector, cfg: &SampleConfig) -> Result<Vec<Post>> {
    if cfg.subreddits.is_empty() {
        return Err(TrackerError::Config("sample.subreddits is empty".into()));
    }

    let mut posts = Vec::new();
    for subreddit in &cfg.subreddits {
        tracing::info!(subreddit = %subreddit, "Collecting from r/{subreddit}...");
        posts.extend(
            collector
                .fetch_top_posts(subreddit, cfg.limit, &cfg.time_filter)
                .await,
        );
    }
    Ok(posts)
}

pub fn sample_file_name(at: DateTime<Local>) -> String {
    format!("sample_posts_{}.json", at.format("%Y%m%d_%H%M%S"))
}

/// Write `posts` as a pretty-printed JSON array under `dir`, creating it if needed.
pub fn write_sample(dir: &Path, posts: &[Post], at: DateTime<Local>) -> Result<PathBuf> {
    if dir.exists() && !dir.is_dir() {
        return Err(TrackerError::Output(format!(
            "{} is not a directory",
            dir.display()
        )));
    }
    fs::create_dir_all(dir)?;

    let path = dir.join(sample_file_name(at));
    let mut out = BufWriter::new(File::create(&path)?);
    serde_json::to_writer_pretty(&mut out, posts)?;
    out.flush()?;
    Ok(path)
}
