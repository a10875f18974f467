//! Actor system for background jobs.
//!
//! This crate provides the Ractor-based actor system behind the
//! `queue_*`/`poll_*` routes.
//!
//! # Architecture
//!
//! - `Supervisor` - Top-level actor owning one queue per operation
//! - `QueueActor` - Owns a single operation's jobs (FIFO)
//! - `WorkerActor` - Pulls jobs from its queue and executes them
//!
//! # Usage
//!
//! ```ignore
//! use actors::{JobHandlerRegistry, JobSystem};
//!
//! let jobs = JobSystem::start(handlers, QueueConfig::default()).await?;
//! let job_id = jobs.enqueue("full_audit", payload).await?;
//! let job = jobs.job("full_audit", job_id).await?;
//! ```

mod client;
mod handler;
mod messages;
mod queue_actor;
mod supervisor;
mod worker_actor;

pub use client::JobSystem;
pub use handler::{FnHandler, HandlerFuture, HandlerResult, JobHandler, JobHandlerRegistry};
pub use messages::{ActorError, ActorResult, QueueMessage, SupervisorMessage, WorkerMessage};
pub use queue_actor::{QueueActor, QueueActorState};
pub use supervisor::{Supervisor, SupervisorArgs};
pub use worker_actor::{WorkerActor, WorkerArgs, run_job};

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort, concurrency};
