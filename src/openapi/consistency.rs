//! Bidirectional comparison of the documented and the registered routes.

use std::fmt;

use super::route_table::RouteTable;

/// A path or method present on exactly one side.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Discrepancy {
    PathMissingInRouter { path: String },
    MethodMissingInRouter { path: String, method: String },
    PathMissingInSpec { path: String },
    MethodMissingInSpec { path: String, method: String },
}

impl Discrepancy {
    pub fn path(&self) -> &str {
        match self {
            Discrepancy::PathMissingInRouter { path }
            | Discrepancy::MethodMissingInRouter { path, .. }
            | Discrepancy::PathMissingInSpec { path }
            | Discrepancy::MethodMissingInSpec { path, .. } => path,
        }
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::PathMissingInRouter { path } => {
                write!(f, "Missing path [{path}] in router")
            }
            Discrepancy::MethodMissingInRouter { path, method } => {
                write!(f, "Missing method [{method}] for path [{path}] in router")
            }
            Discrepancy::PathMissingInSpec { path } => {
                write!(f, "Missing path [{path}] in OpenAPI document")
            }
            Discrepancy::MethodMissingInSpec { path, method } => {
                write!(
                    f,
                    "Missing method [{method}] for path [{path}] in OpenAPI document"
                )
            }
        }
    }
}

/// Every discrepancy found by one check. Order is not meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    discrepancies: Vec<Discrepancy>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }

    pub fn discrepancies(&self) -> &[Discrepancy] {
        &self.discrepancies
    }

    pub fn contains(&self, discrepancy: &Discrepancy) -> bool {
        self.discrepancies.contains(discrepancy)
    }

    pub fn len(&self) -> usize {
        self.discrepancies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discrepancies.is_empty()
    }

    /// `Err` carrying the whole report when anything was found.
    pub fn into_result(self) -> Result<(), ConsistencyReport> {
        if self.is_consistent() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, discrepancy) in self.discrepancies.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{discrepancy}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConsistencyReport {}

/// Compare the documented routes with the registered ones, in both directions.
pub fn check_consistency(spec: &RouteTable, router: &RouteTable) -> ConsistencyReport {
    let mut discrepancies = Vec::new();

    for (path, spec_methods) in spec.iter() {
        let Some(router_methods) = router.methods(path) else {
            discrepancies.push(Discrepancy::PathMissingInRouter {
                path: path.to_string(),
            });
            continue;
        };
        for method in spec_methods.difference(router_methods) {
            discrepancies.push(Discrepancy::MethodMissingInRouter {
                path: path.to_string(),
                method: method.clone(),
            });
        }
    }

    for (path, router_methods) in router.iter() {
        let Some(spec_methods) = spec.methods(path) else {
            discrepancies.push(Discrepancy::PathMissingInSpec {
                path: path.to_string(),
            });
            continue;
        };
        for method in router_methods.difference(spec_methods) {
            discrepancies.push(Discrepancy::MethodMissingInSpec {
                path: path.to_string(),
                method: method.clone(),
            });
        }
    }

    ConsistencyReport { discrepancies }
}
