//! Hook-and-route bridge.
//!
//! This crate contains:
//! - The route registry and dispatcher
//! - The hook manager event bus
//! - `queue_*`/`poll_*` glue over the job system
//! - Built-in route modules and their tank manifests
//! - Configuration and initialization

pub mod bridge;
pub mod config;
pub mod error;
pub mod hooks;
pub mod jobs;
pub mod routes;
pub mod tanks;

mod init;

pub use bridge::{Dispatcher, FnRoute, RouteHandler, RouteRegistry, RouteResult};
pub use config::{BridgeConfig, ConfigError};
pub use error::HandlerError;
pub use hooks::{EmitError, HookError, HookManager, HookResult, Subscriber, SubscriberFailure};
pub use init::{Bridge, InitError, init_bridge};
pub use tanks::TankRegistry;

pub use actors::JobSystem;

// Re-export core types for convenience
pub use bridge_core::{
    DispatchError, HookEvent, JobSnapshot, RouteInfo, TankManifest, event_names,
};
