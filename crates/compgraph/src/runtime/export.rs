//! Diagnostic dependency graph derived from a wired [`Graph`]

use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use super::graph::Graph;
use crate::namespace::NamespaceRef;

/// A bound factory and the namespaces it depends on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyNode {
    pub namespace: String,
    pub locator: String,
    /// Direct dependencies, with container namespaces expanded to leaves
    pub dependencies: Vec<String>,
}

/// Read-only view of a graph's dependency edges.
///
/// Nodes are the bound factories; each edge runs from a dependency to its
/// dependent. Dependencies that are not bound in the graph are omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyGraph {
    /// Nodes in binding order
    pub nodes: Vec<DependencyNode>,
    /// `(dependency, dependent)` pairs
    pub edges: Vec<(String, String)>,
}

impl DependencyGraph {
    pub fn from_graph(graph: &Graph) -> Self {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();

        for (namespace, handle) in graph.iter() {
            let mut dependencies = Vec::new();
            for dependency in handle.node().resolved_dependencies() {
                match graph.lookup(dependency) {
                    Some(NamespaceRef::Leaf(_)) => dependencies.push(dependency.clone()),
                    Some(NamespaceRef::Branch(branch)) => dependencies
                        .extend(branch.iter().map(|(path, _)| format!("{}.{}", dependency, path))),
                    None => {}
                }
            }
            dependencies.sort();
            dependencies.dedup();

            for dependency in &dependencies {
                edges.push((dependency.clone(), namespace.clone()));
            }
            nodes.push(DependencyNode {
                namespace,
                locator: handle.locator().to_string(),
                dependencies,
            });
        }

        Self { nodes, edges }
    }

    pub fn node(&self, namespace: &str) -> Option<&DependencyNode> {
        self.nodes.iter().find(|node| node.namespace == namespace)
    }

    /// Namespaces that depend directly on `namespace`
    pub fn dependents(&self, namespace: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(dependency, _)| dependency == namespace)
            .map(|(_, dependent)| dependent.as_str())
            .collect()
    }

    /// Namespaces `namespace` depends on directly
    pub fn dependencies(&self, namespace: &str) -> Vec<&str> {
        self.node(namespace)
            .map(|node| node.dependencies.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Dependencies-first ordering (Kahn's algorithm).
    ///
    /// The runtime never needs this: setups run concurrently. It exists to
    /// inspect the wiring and to detect cycles.
    pub fn topological_order(&self) -> Result<Vec<&str>, CyclicDependency> {
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for node in &self.nodes {
            in_degree.insert(&node.namespace, node.dependencies.len());
        }
        for (dependency, dependent) in &self.edges {
            dependents
                .entry(dependency.as_str())
                .or_default()
                .push(dependent.as_str());
        }

        // Seed in binding order so the result is deterministic
        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .map(|node| node.namespace.as_str())
            .filter(|ns| in_degree.get(ns) == Some(&0))
            .collect();

        let mut sorted = Vec::with_capacity(self.nodes.len());
        while let Some(namespace) = queue.pop_front() {
            sorted.push(namespace);
            for &dependent in dependents.get(namespace).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if sorted.len() != self.nodes.len() {
            let sorted: HashSet<_> = sorted.into_iter().collect();
            let cycle = self
                .nodes
                .iter()
                .map(|node| node.namespace.clone())
                .filter(|ns| !sorted.contains(ns.as_str()))
                .collect();
            return Err(CyclicDependency(cycle));
        }

        Ok(sorted)
    }

    /// Graphviz rendering
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph compgraph {\n    rankdir=LR;\n");
        for node in &self.nodes {
            out.push_str(&format!(
                "    \"{}\" [label=\"{}\\n{}\"];\n",
                node.namespace, node.namespace, node.locator
            ));
        }
        for (dependency, dependent) in &self.edges {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", dependency, dependent));
        }
        out.push_str("}\n");
        out
    }
}

/// Display the graph as a plan in dependency order
impl fmt::Display for DependencyGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph Plan")?;
        writeln!(f, "==========")?;
        writeln!(f)?;

        let order = match self.topological_order() {
            Ok(order) => order,
            Err(cycle) => {
                writeln!(f, "Warning: {}", cycle)?;
                self.nodes.iter().map(|node| node.namespace.as_str()).collect()
            }
        };

        writeln!(f, "Nodes (dependencies first):")?;
        for (i, namespace) in order.iter().enumerate() {
            let Some(node) = self.node(namespace) else {
                continue;
            };
            writeln!(f)?;
            writeln!(f, "  {}. {}", i + 1, node.namespace)?;
            writeln!(f, "     Type: {}", node.locator)?;
            if !node.dependencies.is_empty() {
                writeln!(f, "     Depends on: {}", node.dependencies.join(", "))?;
            }
        }

        Ok(())
    }
}

/// Namespaces that take part in a dependency cycle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cyclic dependency detected involving nodes: {}", .0.join(", "))]
pub struct CyclicDependency(pub Vec<String>);
