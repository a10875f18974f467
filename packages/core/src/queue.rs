//! Queue configuration and statistics for per-operation job queues.

use serde::{Deserialize, Serialize};

/// Configuration for queue behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Number of concurrent workers for each queue.
    pub concurrency: u32,
    /// Default timeout for jobs (seconds).
    pub default_timeout_secs: u64,
    /// How often an idle worker asks its queue for work (milliseconds).
    pub poll_interval_ms: u64,
    /// Maximum number of pending jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_queue_size: Option<usize>,
    /// Archived terminal jobs kept in memory before polls fall through to
    /// the history store. Ignored when no history store is attached.
    pub max_retained_jobs: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            default_timeout_secs: 300,
            poll_interval_ms: 100,
            max_queue_size: None,
            max_retained_jobs: 1000,
        }
    }
}

impl QueueConfig {
    pub fn with_concurrency(mut self, concurrency: u32) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.default_timeout_secs = timeout_secs;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = Some(max_queue_size);
        self
    }

    pub fn with_max_retained_jobs(mut self, max_retained_jobs: usize) -> Self {
        self.max_retained_jobs = max_retained_jobs;
        self
    }
}

/// Statistics for a queue's current state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueStats {
    /// Number of pending jobs.
    pub pending: u64,
    /// Number of running jobs.
    pub running: u64,
    /// Number of jobs that finished successfully.
    pub done: u64,
    /// Number of jobs that failed.
    pub failed: u64,
}

impl QueueStats {
    /// Total jobs in queue (pending + running).
    pub fn active(&self) -> u64 {
        self.pending + self.running
    }

    /// Total processed jobs.
    pub fn processed(&self) -> u64 {
        self.done + self.failed
    }
}

/// Summary of one operation's queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub operation: String,
    pub config: QueueConfig,
    pub stats: QueueStats,
}
