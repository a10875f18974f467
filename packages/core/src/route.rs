//! Route descriptions for introspection.

use serde::{Deserialize, Serialize};

/// Category assigned to routes that do not declare one.
pub const DEFAULT_CATEGORY: &str = "general";

/// Name, documentation and category of a registered route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub name: String,
    /// One-line summary; the first line of `doc` unless given explicitly.
    pub description: String,
    pub doc: String,
    pub category: String,
}

impl RouteInfo {
    pub fn new(name: impl Into<String>, doc: &str, category: &str) -> Self {
        let doc = doc.trim().to_string();
        let description = doc.lines().next().unwrap_or_default().trim().to_string();
        let category = if category.is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            category.to_string()
        };
        Self {
            name: name.into(),
            description,
            doc,
            category,
        }
    }

    /// Override the summary line.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
