//! Declared dependencies and their resolution into namespaces

use std::collections::BTreeSet;
use std::fmt;

use crate::config::NodeRecord;

/// Namespace every logged node depends on
pub const LOG_NAMESPACE: &str = "log";

/// Computes extra dependency namespaces from a node's raw configuration record
pub type DependencyResolver = fn(&NodeRecord) -> BTreeSet<String>;

#[derive(Clone)]
enum Dependency {
    Namespace(String),
    Resolver(DependencyResolver),
}

/// The dependency declaration of a node type.
///
/// Types compose their requirements explicitly, typically starting from a
/// base declaration:
///
/// ```
/// use compgraph::node::Requires;
///
/// let requires = Requires::logged().namespace("calendar");
/// let resolved = requires.resolve(None);
/// assert!(resolved.contains("log") && resolved.contains("calendar"));
/// ```
#[derive(Clone, Default)]
pub struct Requires {
    dependencies: Vec<Dependency>,
}

impl Requires {
    /// No dependencies at all
    pub fn none() -> Self {
        Self::default()
    }

    /// The base declaration shared by nodes that log through the graph
    pub fn logged() -> Self {
        Self::none().namespace(LOG_NAMESPACE)
    }

    /// Depend on a fixed namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.dependencies.push(Dependency::Namespace(namespace.into()));
        self
    }

    /// Depend on namespaces computed from the configuration record
    pub fn resolver(mut self, resolver: DependencyResolver) -> Self {
        self.dependencies.push(Dependency::Resolver(resolver));
        self
    }

    /// Union with another declaration
    pub fn merge(mut self, other: Requires) -> Self {
        self.dependencies.extend(other.dependencies);
        self
    }

    /// Expand into concrete namespaces.
    ///
    /// Resolvers only run when a configuration record is available; nodes
    /// created without one (components) resolve their fixed namespaces only.
    pub fn resolve(&self, record: Option<&NodeRecord>) -> BTreeSet<String> {
        let mut resolved = BTreeSet::new();
        for dependency in &self.dependencies {
            match (dependency, record) {
                (Dependency::Namespace(namespace), _) => {
                    resolved.insert(namespace.clone());
                }
                (Dependency::Resolver(resolver), Some(record)) => {
                    resolved.extend(resolver(record));
                }
                (Dependency::Resolver(_), None) => {
                    log::warn!("Dependency resolver skipped: no configuration record");
                }
            }
        }
        resolved
    }
}

impl fmt::Debug for Requires {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for dependency in &self.dependencies {
            match dependency {
                Dependency::Namespace(ns) => list.entry(ns),
                Dependency::Resolver(_) => list.entry(&"<resolver>"),
            };
        }
        list.finish()
    }
}
