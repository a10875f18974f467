//! Repository implementations for database operations.

mod bridge_repo;
mod event_log_repo;
mod follow_repo;
mod hypothesis_repo;
mod job_history_repo;

pub use bridge_repo::BridgeRepository;
pub use event_log_repo::{EventLogEntry, EventLogRepository};
pub use follow_repo::{FollowAction, FollowEdge, FollowRepository};
pub use hypothesis_repo::HypothesisRepository;
pub use job_history_repo::{JobHistoryRecord, JobHistoryRepository};
