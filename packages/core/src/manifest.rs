//! Tank manifests: declarative descriptions of optional route modules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Description of a tank and the routes it exposes.
///
/// Used for registration bookkeeping and introspection only; dispatch never
/// consults manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankManifest {
    /// Route name to one-line description.
    pub routes: BTreeMap<String, String>,
    /// Whether the tank's handlers mutate shared state.
    #[serde(default)]
    pub allowed_state_mutation: bool,
    /// Payload keys every mutating route of this tank requires.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_payload: Vec<String>,
}

impl TankManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a route.
    pub fn route(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.routes.insert(name.into(), description.into());
        self
    }

    /// Mark the tank as mutating shared state.
    pub fn mutating(mut self) -> Self {
        self.allowed_state_mutation = true;
        self
    }

    pub fn requires(mut self, fields: &[&str]) -> Self {
        self.required_payload = fields.iter().map(|f| f.to_string()).collect();
        self
    }
}
