use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracker_common::observability::init_logging;
use tracker_config::{TrackerConfig, TrackerConfigLoader};
use tracker_social::{
    Collector, DEFAULT_LIMIT, DEFAULT_SEARCH_TIME_FILTER, DEFAULT_TOP_TIME_FILTER,
};

mod sample;

const DEFAULT_CONFIG_FILE: &str = "tracker.yaml";

#[derive(Parser)]
#[command(name = "tracker")]
#[command(about = "Collect posts and comments from Reddit")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ./tracker.yaml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Collect top posts from the configured communities into a timestamped JSON file
    Sample {
        /// Overrides sample.output_dir
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print top posts of a subreddit as JSON
    Top {
        subreddit: String,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
        /// hour, day, week, month, year or all
        #[arg(long, default_value = DEFAULT_TOP_TIME_FILTER)]
        time_filter: String,
    },
    /// Print the comments of a post as JSON, breadth first
    Comments {
        post_id: String,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Search posts and print them as JSON
    Search {
        query: String,
        /// Restrict to one subreddit (default: all of Reddit)
        #[arg(long)]
        subreddit: Option<String>,
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
        #[arg(long, default_value = DEFAULT_SEARCH_TIME_FILTER)]
        time_filter: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<TrackerConfig> {
    let loader = match path {
        Some(path) => TrackerConfigLoader::new().with_file(path),
        None => TrackerConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    loader.load().context("loading configuration")
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = load_config(cli.config.as_ref())?;
    let log_path = init_logging(cfg.logging.to_log_config("tracker"))?;
    tracing::debug!(log = %log_path.display(), config = ?cfg.reddit, "tracker.start");

    let collector = Collector::connect(&cfg.reddit, &cfg.collector).await?;

    match cli.command {
        Command::Sample { output_dir } => {
            let dir = output_dir.unwrap_or_else(|| cfg.sample.output_dir.clone());
            let posts = sample::collect_sample(&collector, &cfg.sample).await?;
            let path = sample::write_sample(&dir, &posts, chrono::Local::now())?;
            tracing::info!(count = posts.len(), path = %path.display(), "Saved {} posts to {}", posts.len(), path.display());
            println!("{}", path.display());
        }
        Command::Top {
            subreddit,
            limit,
            time_filter,
        } => {
            let posts = collector
                .try_fetch_top_posts(&subreddit, limit, &time_filter)
                .await?;
            print_json(&posts)?;
        }
        Command::Comments { post_id, limit } => {
            let comments = collector.try_fetch_comments(&post_id, limit).await?;
            print_json(&comments)?;
        }
        Command::Search {
            query,
            subreddit,
            limit,
            time_filter,
        } => {
            let posts = collector
                .try_search_posts(&query, subreddit.as_deref(), limit, &time_filter)
                .await?;
            print_json(&posts)?;
        }
    }

    Ok(())
}
