//! Tank registry: manifests of the route modules that make up the bridge.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use bridge_core::TankManifest;

/// Named tank manifests. Bookkeeping only; dispatch never reads it.
#[derive(Default)]
pub struct TankRegistry {
    tanks: RwLock<BTreeMap<String, TankManifest>>,
}

impl TankRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a tank's manifest.
    pub fn register(&self, name: impl Into<String>, manifest: TankManifest) {
        let name = name.into();
        tracing::debug!(tank = %name, routes = manifest.routes.len(), "Registered tank");
        self.tanks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, manifest);
    }

    pub fn manifest(&self, name: &str) -> Option<TankManifest> {
        self.tanks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Tank names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.tanks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn all(&self) -> BTreeMap<String, TankManifest> {
        self.tanks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every route of every tank with its description. When two tanks
    /// declare the same route, the tank sorting last wins.
    pub fn list_routes(&self) -> BTreeMap<String, String> {
        self.tanks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .flat_map(|m| m.routes.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_routes_flattens_manifests() {
        let tanks = TankRegistry::new();
        tanks.register("a", TankManifest::new().route("one", "First"));
        tanks.register(
            "b",
            TankManifest::new()
                .route("two", "Second")
                .mutating()
                .requires(&["id"]),
        );

        let routes = tanks.list_routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes["two"], "Second");
        assert_eq!(tanks.names(), vec!["a", "b"]);
        assert!(tanks.manifest("b").is_some_and(|m| m.allowed_state_mutation));
        assert!(tanks.manifest("missing").is_none());
    }
}
