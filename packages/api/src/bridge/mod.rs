//! Route registry and dispatcher: the single entry point for UI actions.

mod dispatcher;
mod registry;

pub use dispatcher::Dispatcher;
pub use registry::{FnRoute, RouteFuture, RouteHandler, RouteRegistry, RouteResult};
