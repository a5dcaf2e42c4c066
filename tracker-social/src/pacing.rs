//! Delay applied after every collected record.
use std::time::Duration;

use async_trait::async_trait;
use tracker_config::CollectorConfig;

pub const DEFAULT_ITEM_DELAY: Duration = Duration::from_millis(100);

#[async_trait]
pub trait Pacer: Send + Sync {
    async fn wait_before_next_item(&self);
}

/// Sleeps a fixed interval, whatever the remote rate-limit budget says.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_config(cfg: &CollectorConfig) -> Self {
        Self::new(Duration::from_millis(cfg.item_delay_ms))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_ITEM_DELAY)
    }
}

#[async_trait]
impl Pacer for FixedDelay {
    async fn wait_before_next_item(&self) {
        tokio::time::sleep(self.delay).await;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn wait_before_next_item(&self) {}
}
