//! Path -> method tables extracted from an OpenAPI document or a route registry.

use std::collections::{BTreeMap, BTreeSet};

use super::document::{OpenApiDocument, ROUTED_METHODS};
use crate::routes::RouteRegistry;

/// Mapping from path template to the upper-case HTTP methods served on it.
///
/// Paths are compared verbatim: no trailing slash or placeholder
/// normalization happens here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    routes: BTreeMap<String, BTreeSet<String>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes declared in an OpenAPI document.
    ///
    /// Every path gets an entry, even when none of its operations is one of
    /// GET/PUT/DELETE/POST/PATCH.
    pub fn from_document(document: &OpenApiDocument) -> Self {
        let mut table = Self::new();
        for (path, _) in document.paths() {
            table.insert_path(path);
            for method in ROUTED_METHODS {
                if document.operation(path, method).is_some() {
                    table.insert(path, method);
                }
            }
        }
        table
    }

    /// Routes registered on a route registry.
    pub fn from_registry<S>(registry: &RouteRegistry<S>) -> Self {
        let mut table = Self::new();
        for route in registry.routes() {
            table.insert(&route.path, route.method.as_str());
        }
        table
    }

    /// Ensure `path` has an entry, possibly without methods.
    pub fn insert_path(&mut self, path: &str) {
        self.routes.entry(path.to_string()).or_default();
    }

    pub fn insert(&mut self, path: &str, method: &str) {
        self.routes
            .entry(path.to_string())
            .or_default()
            .insert(method.to_ascii_uppercase());
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    pub fn methods(&self, path: &str) -> Option<&BTreeSet<String>> {
        self.routes.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.routes.iter().map(|(path, methods)| (path.as_str(), methods))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
