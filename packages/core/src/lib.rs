//! Core domain types for the route bridge.
//!
//! This crate contains shared types used across all packages:
//! - Job, JobStatus and JobSnapshot for background work
//! - QueueConfig and QueueStats for per-operation job queues
//! - Events for lifecycle updates and hook payloads
//! - Route descriptions and tank manifests for introspection
//! - Store records for hypotheses and cross-universe provenance

mod error;
mod events;
mod hypothesis;
mod job;
mod manifest;
mod provenance;
mod queue;
mod route;

pub mod event_names;

pub use error::DispatchError;
pub use events::{HookEvent, JobEvent};
pub use hypothesis::{HistoryEntry, Hypothesis};
pub use job::{Job, JobId, JobSnapshot, JobStatus};
pub use manifest::TankManifest;
pub use provenance::BridgeRecord;
pub use queue::{QueueConfig, QueueInfo, QueueStats};
pub use route::{DEFAULT_CATEGORY, RouteInfo};
