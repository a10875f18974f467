//! Bridge initialization: store, job system, hooks and routes wired together.

use std::sync::Arc;

use actors::{ActorError, JobHandlerRegistry, JobSystem};
use bridge_core::DispatchError;
use db::repositories::JobHistoryRepository;
use db::{Database, DbError};
use serde_json::Value;
use thiserror::Error;

use crate::bridge::{Dispatcher, RouteRegistry};
use crate::config::{BridgeConfig, ConfigError};
use crate::hooks::HookManager;
use crate::routes::{self, RouteContext};
use crate::tanks::TankRegistry;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Job system error: {0}")]
    Jobs(#[from] ActorError),
}

/// A running bridge. Each instance owns its own registries, so several can
/// live side by side.
#[derive(Clone)]
pub struct Bridge {
    pub routes: Arc<RouteRegistry>,
    pub hooks: Arc<HookManager>,
    pub tanks: Arc<TankRegistry>,
    pub jobs: JobSystem,
    pub db: Database,
    dispatcher: Dispatcher,
}

impl Bridge {
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    pub async fn dispatch_route(&self, name: &str, payload: Value) -> Result<Value, DispatchError> {
        self.dispatcher.dispatch_route(name, payload).await
    }

    /// Stop the job system. Routes stay registered but queue routes fail.
    pub async fn shutdown(&self) {
        self.jobs.shutdown().await;
        tracing::info!("Bridge stopped");
    }
}

/// Initialize the bridge.
///
/// Opens the store, starts the job system with every built-in operation and
/// registers the built-in routes.
pub async fn init_bridge(config: &BridgeConfig) -> Result<Bridge, InitError> {
    tracing::info!("Initializing bridge...");
    config.validate()?;

    let db = db::init(&config.db).await?;
    let hooks = Arc::new(HookManager::new());
    let tanks = Arc::new(TankRegistry::new());
    let registry = Arc::new(RouteRegistry::new());

    let mut handlers = JobHandlerRegistry::new();
    routes::register_operations(&mut handlers, &hooks, &db);

    let jobs = JobSystem::start_with_history(
        handlers,
        config.queue.clone(),
        Some(JobHistoryRepository::new(db.clone())),
    )
    .await?;

    let ctx = RouteContext::new(&db, hooks.clone(), tanks.clone(), jobs.clone(), &registry);
    routes::register_all(&registry, &ctx);

    tracing::info!(
        routes = registry.len(),
        tanks = tanks.names().len(),
        "Bridge initialized"
    );

    Ok(Bridge {
        dispatcher: Dispatcher::new(registry.clone()),
        routes: registry,
        hooks,
        tanks,
        jobs,
        db,
    })
}
